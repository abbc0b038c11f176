//! Sales report definitions for the supermarket document store.
//!
//! Reports are declarative aggregation pipelines: an ordered list of typed
//! stages that renders to BSON for the store to execute. Rows coming back
//! are decoded into the typed read models in [`rows`].

pub mod pipeline;
pub mod report;
pub mod rows;
pub mod value;

pub use pipeline::{Accumulator, Expr, Filter, Group, Lookup, Pipeline, Projection, SortOrder, Stage};
pub use report::{
    PipelineExplain, ReportKind, UnknownReport, detailed_sales, sales_by_category,
    sales_with_products, sales_with_products_for_customer,
};
pub use rows::{CategorySalesRow, DetailedSaleRow, ProductEntry, ReportEnvelope, SaleWithProducts};

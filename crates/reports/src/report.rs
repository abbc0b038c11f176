//! Report definitions over the `ventas` collection.
//!
//! Every report is a read-only aggregation submitted to the store. Joins are
//! inner joins: `$lookup` followed by `$unwind` drops rows whose reference
//! does not resolve (a sale with no resolvable line item vanishes entirely).

use core::fmt;
use core::str::FromStr;

use serde::Serialize;
use serde_json::Value as JsonValue;

use supermarket_core::CustomerId;

use crate::pipeline::{Accumulator, Expr, Filter, Pipeline, Projection, SortOrder, Stage};

pub const SALES: &str = "ventas";
pub const PRODUCTS: &str = "productos";
pub const CUSTOMERS: &str = "clientes";
pub const CATEGORIES: &str = "categorias";

/// Denormalized sales view: each sale with its resolved products.
///
/// Output: `{_id, cliente_id, fecha, total, productos: [{nombre, precio, cantidad}]}`.
pub fn sales_with_products() -> Pipeline {
    Pipeline::new()
        .unwind("items")
        .lookup(PRODUCTS, "items.producto_id", "_id", "producto")
        .unwind("producto")
        .group(
            Expr::field("_id"),
            [
                ("cliente_id", Accumulator::First(Expr::field("cliente_id"))),
                ("fecha", Accumulator::First(Expr::field("fecha"))),
                ("total", Accumulator::First(Expr::field("total"))),
                (
                    "productos",
                    Accumulator::Push(Expr::object([
                        ("nombre", Expr::field("producto.nombre")),
                        ("precio", Expr::field("producto.precio")),
                        ("cantidad", Expr::field("items.cantidad")),
                    ])),
                ),
            ],
        )
        .project([
            ("cliente_id", Projection::Include),
            ("fecha", Projection::Include),
            ("total", Projection::Include),
            ("productos", Projection::Include),
        ])
}

/// [`sales_with_products`] restricted to one customer's sales.
pub fn sales_with_products_for_customer(customer: CustomerId) -> Pipeline {
    sales_with_products().prepend(Stage::Match(Filter::eq("cliente_id", customer.get())))
}

/// One row per resolvable line item, with customer, product and category
/// names and the line subtotal. Newest sales first.
pub fn detailed_sales() -> Pipeline {
    Pipeline::new()
        .lookup(CUSTOMERS, "cliente_id", "_id", "cliente")
        .unwind("cliente")
        .unwind("items")
        .lookup(PRODUCTS, "items.producto_id", "_id", "producto")
        .unwind("producto")
        .lookup(CATEGORIES, "producto.categoria_id", "_id", "categoria")
        .unwind("categoria")
        .project([
            ("_id", Projection::Exclude),
            ("venta_id", Projection::Computed(Expr::field("_id"))),
            ("fecha", Projection::Computed(Expr::field("fecha"))),
            ("cliente_nombre", Projection::Computed(Expr::field("cliente.nombre"))),
            ("cliente_email", Projection::Computed(Expr::field("cliente.email"))),
            ("producto_nombre", Projection::Computed(Expr::field("producto.nombre"))),
            ("categoria_nombre", Projection::Computed(Expr::field("categoria.nombre"))),
            ("cantidad", Projection::Computed(Expr::field("items.cantidad"))),
            ("precio_unitario", Projection::Computed(Expr::field("producto.precio"))),
            ("subtotal", Projection::Computed(line_revenue())),
            ("total_venta", Projection::Computed(Expr::field("total"))),
        ])
        .sort([
            ("fecha", SortOrder::Descending),
            ("cliente_nombre", SortOrder::Ascending),
        ])
}

/// Line count, units and revenue per category name, highest revenue first.
pub fn sales_by_category() -> Pipeline {
    Pipeline::new()
        .unwind("items")
        .lookup(PRODUCTS, "items.producto_id", "_id", "producto")
        .unwind("producto")
        .lookup(CATEGORIES, "producto.categoria_id", "_id", "categoria")
        .unwind("categoria")
        .group(
            Expr::field("categoria.nombre"),
            [
                ("total_ventas", Accumulator::Sum(Expr::literal(1))),
                ("total_cantidad", Accumulator::Sum(Expr::field("items.cantidad"))),
                ("total_ingresos", Accumulator::Sum(line_revenue())),
            ],
        )
        .project([
            ("_id", Projection::Exclude),
            ("categoria", Projection::Computed(Expr::field("_id"))),
            ("total_ventas", Projection::Include),
            ("total_cantidad", Projection::Include),
            ("total_ingresos", Projection::Include),
        ])
        .sort([("total_ingresos", SortOrder::Descending)])
}

fn line_revenue() -> Expr {
    Expr::multiply([Expr::field("items.cantidad"), Expr::field("producto.precio")])
}

/// Named reports the runner knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    SalesWithProducts,
    DetailedSales,
    SalesByCategory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReport(pub String);

impl fmt::Display for UnknownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown report `{}`", self.0)
    }
}

impl std::error::Error for UnknownReport {}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [
        ReportKind::SalesWithProducts,
        ReportKind::DetailedSales,
        ReportKind::SalesByCategory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::SalesWithProducts => "sales-with-products",
            ReportKind::DetailedSales => "detailed-sales",
            ReportKind::SalesByCategory => "sales-by-category",
        }
    }

    /// Collection the aggregation is submitted against.
    pub fn source_collection(&self) -> &'static str {
        SALES
    }

    pub fn pipeline(&self) -> Pipeline {
        match self {
            ReportKind::SalesWithProducts => sales_with_products(),
            ReportKind::DetailedSales => detailed_sales(),
            ReportKind::SalesByCategory => sales_by_category(),
        }
    }

    pub fn explain(&self) -> PipelineExplain {
        PipelineExplain::new(self.name(), self.source_collection(), &self.pipeline())
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportKind {
    type Err = UnknownReport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ReportKind::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| UnknownReport(s.to_string()))
    }
}

/// Step-by-step explanation of a pipeline plus its full JSON rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineExplain {
    pub report: String,
    pub collection: String,
    pub steps: Vec<String>,
    pub pipeline: JsonValue,
}

impl PipelineExplain {
    pub fn new(report: impl Into<String>, collection: impl Into<String>, pipeline: &Pipeline) -> Self {
        let steps = pipeline
            .stages()
            .iter()
            .enumerate()
            .map(|(n, stage)| format!("{}. {} - {}", n + 1, stage.operator(), stage.describe()))
            .collect();
        Self {
            report: report.into(),
            collection: collection.into(),
            steps,
            pipeline: pipeline.to_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn sales_with_products_renders_the_five_stages() {
        let rendered = sales_with_products().to_documents();
        assert_eq!(
            rendered,
            vec![
                doc! { "$unwind": "$items" },
                doc! { "$lookup": {
                    "from": "productos",
                    "localField": "items.producto_id",
                    "foreignField": "_id",
                    "as": "producto",
                } },
                doc! { "$unwind": "$producto" },
                doc! { "$group": {
                    "_id": "$_id",
                    "cliente_id": { "$first": "$cliente_id" },
                    "fecha": { "$first": "$fecha" },
                    "total": { "$first": "$total" },
                    "productos": { "$push": {
                        "nombre": "$producto.nombre",
                        "precio": "$producto.precio",
                        "cantidad": "$items.cantidad",
                    } },
                } },
                doc! { "$project": { "cliente_id": 1, "fecha": 1, "total": 1, "productos": 1 } },
            ]
        );
    }

    #[test]
    fn customer_scope_prepends_match() {
        let p = sales_with_products_for_customer(CustomerId::new(9));
        assert_eq!(p.len(), 6);
        assert_eq!(p.to_documents()[0], doc! { "$match": { "cliente_id": 9i64 } });
    }

    #[test]
    fn detailed_sales_joins_three_collections_and_sorts() {
        let p = detailed_sales();
        assert_eq!(p.joined_collections(), vec![CUSTOMERS, PRODUCTS, CATEGORIES]);
        assert_eq!(
            p.to_documents().last().unwrap(),
            &doc! { "$sort": { "fecha": -1, "cliente_nombre": 1 } }
        );
    }

    #[test]
    fn sales_by_category_sums_revenue() {
        let p = sales_by_category();
        let group = p
            .to_documents()
            .into_iter()
            .find(|d| d.contains_key("$group"))
            .unwrap();
        assert_eq!(
            group,
            doc! { "$group": {
                "_id": "$categoria.nombre",
                "total_ventas": { "$sum": 1 },
                "total_cantidad": { "$sum": "$items.cantidad" },
                "total_ingresos": { "$sum": { "$multiply": ["$items.cantidad", "$producto.precio"] } },
            } }
        );
    }

    #[test]
    fn report_names_round_trip_and_accept_underscores() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.name().parse::<ReportKind>().unwrap(), kind);
        }
        assert_eq!(
            "Sales_By_Category".parse::<ReportKind>().unwrap(),
            ReportKind::SalesByCategory
        );
        assert_eq!(
            "nope".parse::<ReportKind>().unwrap_err(),
            UnknownReport("nope".to_string())
        );
    }

    #[test]
    fn explain_numbers_every_stage() {
        let explain = ReportKind::SalesWithProducts.explain();
        assert_eq!(explain.collection, "ventas");
        assert_eq!(explain.steps.len(), 5);
        assert!(explain.steps[0].starts_with("1. $unwind"));
        assert!(explain.steps[4].starts_with("5. $project"));
        assert_eq!(explain.pipeline.as_array().map(Vec::len), Some(5));
    }
}

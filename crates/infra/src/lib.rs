//! Infrastructure layer: document stores, configuration, catalog reads,
//! fixture import and report execution.

pub mod catalog;
pub mod config;
pub mod document_store;
pub mod import;
pub mod reports;

pub use catalog::Catalog;
pub use config::{ConfigError, StoreConfig, StoreKind};
pub use document_store::{
    DocumentStore, InMemoryDocumentStore, MongoDocumentStore, StoreError, StoreResult, open_store,
};
pub use import::{Fixture, ImportSummary, import_fixture};
pub use reports::ReportRunner;

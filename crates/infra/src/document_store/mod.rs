//! Document store boundary.
//!
//! Reports are submitted as aggregation pipelines to a [`DocumentStore`].
//! Production runs against MongoDB; tests and offline runs use the in-memory
//! store, which evaluates the same pipelines locally.

pub(crate) mod engine;
pub mod in_memory;
pub mod mongo;
pub mod r#trait;

use std::sync::Arc;

use tracing::info;

pub use in_memory::InMemoryDocumentStore;
pub use mongo::MongoDocumentStore;
pub use r#trait::{DocumentStore, StoreError, StoreResult};

use crate::config::{StoreConfig, StoreKind};
use crate::import::{Fixture, import_fixture};

/// Open the store selected by `config`.
///
/// For the in-memory backend, `config.fixture` (when set) is imported before
/// the store is handed out.
pub async fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
    config.validate()?;
    match config.kind {
        StoreKind::MongoDb => {
            let store = MongoDocumentStore::connect(config).await?;
            Ok(Arc::new(store))
        }
        StoreKind::Memory => {
            let store = InMemoryDocumentStore::new();
            if let Some(path) = &config.fixture {
                let fixture = Fixture::from_path(path)?;
                let summary = import_fixture(&store, &fixture).await?;
                info!(fixture = %path.display(), collections = summary.collections.len(), "fixture loaded");
            }
            Ok(Arc::new(store))
        }
    }
}

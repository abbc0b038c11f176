use std::sync::Arc;

use bson::Document;
use thiserror::Error;

use supermarket_core::DomainError;
use supermarket_reports::{Filter, Pipeline};

use crate::config::ConfigError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Document store operation error.
///
/// These are **infrastructure errors** (connectivity, encoding, fixture
/// loading). Failures raised by the store itself are passed through unchanged
/// inside [`StoreError::Mongo`]; nothing here retries.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mongodb: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("failed to decode `{context}` document: {source}")]
    Decode {
        context: String,
        #[source]
        source: bson::de::Error,
    },

    #[error("failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("{collection} record {id} not found")]
    NotFound { collection: &'static str, id: i64 },

    #[error("invalid record: {0}")]
    Invalid(#[from] DomainError),

    #[error("cannot read fixture {path}: {source}")]
    FixtureIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fixture is not valid JSON: {0}")]
    FixtureJson(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("in-memory store lock poisoned")]
    Poisoned,
}

/// Read-mostly document store boundary.
///
/// Reports only ever call [`find`](DocumentStore::find) and
/// [`aggregate`](DocumentStore::aggregate); both are read-only. Writes exist
/// solely for fixture import.
///
/// Missing collections behave as empty, matching the store.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs (`"mongodb"`, `"memory"`).
    fn backend(&self) -> &'static str;

    /// Documents of `collection` matching `filter`, in natural order.
    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>>;

    /// Execute `pipeline` against `collection` and return every output document.
    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>>;

    /// Drop `collection` and insert `documents`. Returns the inserted count.
    async fn replace_collection(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<u64>;

    async fn list_collections(&self) -> StoreResult<Vec<String>>;
}

#[async_trait::async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        (**self).find(collection, filter).await
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        (**self).aggregate(collection, pipeline).await
    }

    async fn replace_collection(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<u64> {
        (**self).replace_collection(collection, documents).await
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        (**self).list_collections().await
    }
}

/// Decode a store document into a typed row, tagging failures with `context`.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    context: &str,
    doc: Document,
) -> StoreResult<T> {
    bson::from_document(doc).map_err(|source| StoreError::Decode {
        context: context.to_string(),
        source,
    })
}

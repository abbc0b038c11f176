use std::collections::HashMap;
use std::sync::RwLock;

use bson::Document;
use tracing::debug;

use supermarket_reports::{Filter, Pipeline};

use super::engine;
use super::r#trait::{DocumentStore, StoreError, StoreResult};

/// In-memory document store for tests/dev.
///
/// Pipelines run through [`engine::execute`], which evaluates the stage kinds
/// the reports use. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one document to `collection` (creating it if needed).
    pub fn insert(&self, collection: &str, doc: Document) -> StoreResult<()> {
        let mut map = self.collections.write().map_err(|_| StoreError::Poisoned)?;
        map.entry(collection.to_string()).or_default().push(doc);
        Ok(())
    }

    pub fn count(&self, collection: &str) -> StoreResult<usize> {
        let map = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(collection).map(Vec::len).unwrap_or(0))
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let map = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        let docs: Vec<Document> = map
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();
        Ok(docs)
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        let map = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        let input = map.get(collection).cloned().unwrap_or_default();
        let output = engine::execute(pipeline, input, &*map);
        debug!(collection, stages = pipeline.len(), count = output.len(), "aggregate completed");
        Ok(output)
    }

    async fn replace_collection(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<u64> {
        let mut map = self.collections.write().map_err(|_| StoreError::Poisoned)?;
        let count = documents.len() as u64;
        map.insert(collection.to_string(), documents);
        Ok(count)
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        let map = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[tokio::test]
    async fn find_applies_equality_filter() {
        let store = InMemoryDocumentStore::new();
        store.insert("productos", doc! { "_id": 1, "categoria_id": 2 }).unwrap();
        store.insert("productos", doc! { "_id": 2, "categoria_id": 3 }).unwrap();

        let found = store
            .find("productos", &Filter::eq("categoria_id", 2i64))
            .await
            .unwrap();
        assert_eq!(found, vec![doc! { "_id": 1, "categoria_id": 2 }]);
    }

    #[tokio::test]
    async fn missing_collection_is_empty() {
        let store = InMemoryDocumentStore::new();
        assert!(store.find("ventas", &Filter::all()).await.unwrap().is_empty());
        assert!(
            store
                .aggregate("ventas", &Pipeline::new().unwind("items"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn replace_collection_drops_previous_documents() {
        let store = InMemoryDocumentStore::new();
        store.insert("clientes", doc! { "_id": 1 }).unwrap();
        let n = store
            .replace_collection("clientes", vec![doc! { "_id": 2 }, doc! { "_id": 3 }])
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(store.count("clientes").unwrap(), 2);
        assert_eq!(store.list_collections().await.unwrap(), vec!["clientes".to_string()]);
    }
}

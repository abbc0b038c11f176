//! MongoDB-backed document store.
//!
//! All query planning, joining and grouping happens inside the server; this
//! adapter only ships the rendered pipeline and drains the cursor.

use bson::Document;
use futures::TryStreamExt;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tracing::{debug, info};

use supermarket_reports::{Filter, Pipeline};

use super::r#trait::{DocumentStore, StoreResult};
use crate::config::StoreConfig;

#[derive(Debug, Clone)]
pub struct MongoDocumentStore {
    database: Database,
}

impl MongoDocumentStore {
    /// Build a client for `config.mongo_uri` and bind `config.database`.
    ///
    /// The driver connects lazily, so an unreachable server surfaces on the
    /// first query rather than here.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let mut opts = ClientOptions::parse(&config.mongo_uri).await?;
        opts.app_name = Some(config.app_name.clone());
        let client = Client::with_options(opts)?;
        let database = client.database(&config.database);
        info!(database = %config.database, "mongodb client configured");
        Ok(Self { database })
    }
}

#[async_trait::async_trait]
impl DocumentStore for MongoDocumentStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    #[tracing::instrument(skip(self, filter), fields(backend = "mongodb"))]
    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let cursor = self
            .database
            .collection::<Document>(collection)
            .find(filter.to_document())
            .await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        debug!(count = docs.len(), "find completed");
        Ok(docs)
    }

    #[tracing::instrument(skip(self, pipeline), fields(backend = "mongodb", stages = pipeline.len()))]
    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        let cursor = self
            .database
            .collection::<Document>(collection)
            .aggregate(pipeline.to_documents())
            .await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        debug!(count = docs.len(), "aggregate completed");
        Ok(docs)
    }

    #[tracing::instrument(skip(self, documents), fields(backend = "mongodb", count = documents.len()))]
    async fn replace_collection(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<u64> {
        let coll = self.database.collection::<Document>(collection);
        coll.drop().await?;
        if documents.is_empty() {
            return Ok(0);
        }
        let result = coll.insert_many(documents).await?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        let mut names = self.database.list_collection_names().await?;
        names.sort();
        Ok(names)
    }
}

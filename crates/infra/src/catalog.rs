//! Typed catalog reads over a [`DocumentStore`].
//!
//! Every read is an equality filter on one collection; documents are decoded
//! into the matching [`Record`] type.

use tracing::debug;

use supermarket_core::{CategoryId, CustomerId, Record};
use supermarket_products::Product;
use supermarket_reports::Filter;
use supermarket_sales::Sale;

use crate::document_store::r#trait::decode;
use crate::document_store::{DocumentStore, StoreError, StoreResult};

pub struct Catalog<S> {
    store: S,
}

impl<S> Catalog<S>
where
    S: DocumentStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Every record of `T`'s collection.
    pub async fn list<T: Record>(&self) -> StoreResult<Vec<T>> {
        self.find(&Filter::all()).await
    }

    /// One record by `_id`; [`StoreError::NotFound`] when absent.
    pub async fn get<T: Record>(&self, id: T::Id) -> StoreResult<T> {
        let raw: i64 = id.into();
        self.find::<T>(&Filter::eq("_id", raw))
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound {
                collection: T::COLLECTION,
                id: raw,
            })
    }

    pub async fn products_by_category(&self, category: CategoryId) -> StoreResult<Vec<Product>> {
        self.find(&Filter::eq("categoria_id", category.get())).await
    }

    pub async fn sales_by_customer(&self, customer: CustomerId) -> StoreResult<Vec<Sale>> {
        self.find(&Filter::eq("cliente_id", customer.get())).await
    }

    async fn find<T: Record>(&self, filter: &Filter) -> StoreResult<Vec<T>> {
        let docs = self.store.find(T::COLLECTION, filter).await?;
        debug!(
            backend = self.store.backend(),
            collection = T::COLLECTION,
            count = docs.len(),
            "catalog read"
        );
        docs.into_iter().map(|d| decode(T::COLLECTION, d)).collect()
    }
}

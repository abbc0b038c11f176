//! JSON fixture import.
//!
//! A fixture holds any subset of the five collections. Every record is
//! decoded into its typed form and validated before anything is written;
//! each collection present in the fixture then replaces the stored one.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use supermarket_core::{ProductId, Record, SaleId};
use supermarket_parties::{Customer, Supplier};
use supermarket_products::{Category, Product};
use supermarket_sales::Sale;

use crate::document_store::{DocumentStore, StoreError, StoreResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(rename = "categorias", default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
    #[serde(rename = "proveedores", default, skip_serializing_if = "Option::is_none")]
    pub suppliers: Option<Vec<Supplier>>,
    #[serde(rename = "clientes", default, skip_serializing_if = "Option::is_none")]
    pub customers: Option<Vec<Customer>>,
    #[serde(rename = "productos", default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
    #[serde(rename = "ventas", default, skip_serializing_if = "Option::is_none")]
    pub sales: Option<Vec<Sale>>,
}

impl Fixture {
    pub fn from_json_str(raw: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| StoreError::FixtureIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Line items whose product is not part of the fixture's `productos`.
    ///
    /// Those items will not appear in the denormalized sales view. Empty when
    /// the fixture carries no products (they may already be stored).
    pub fn unresolved_line_items(&self) -> Vec<(SaleId, ProductId)> {
        let (Some(products), Some(sales)) = (&self.products, &self.sales) else {
            return Vec::new();
        };
        let known: HashSet<ProductId> = products.iter().map(|p| p.id).collect();
        sales
            .iter()
            .flat_map(|s| s.product_ids().into_iter().map(move |product| (s.id, product)))
            .filter(|(_, product)| !known.contains(product))
            .collect()
    }
}

/// Inserted document count per collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub collections: BTreeMap<String, u64>,
}

impl ImportSummary {
    pub fn total(&self) -> u64 {
        self.collections.values().sum()
    }
}

/// Validate and encode `records`. Nothing is written if any record fails.
fn encode_all<T: Record>(records: &[T]) -> StoreResult<Vec<bson::Document>> {
    records
        .iter()
        .map(|r| -> StoreResult<bson::Document> {
            r.validate()?;
            Ok(bson::to_document(r)?)
        })
        .collect()
}

pub async fn import_fixture<S>(store: &S, fixture: &Fixture) -> StoreResult<ImportSummary>
where
    S: DocumentStore + ?Sized,
{
    let mut batches: Vec<(&'static str, Vec<bson::Document>)> = Vec::new();
    if let Some(records) = &fixture.categories {
        batches.push((Category::COLLECTION, encode_all(records)?));
    }
    if let Some(records) = &fixture.suppliers {
        batches.push((Supplier::COLLECTION, encode_all(records)?));
    }
    if let Some(records) = &fixture.customers {
        batches.push((Customer::COLLECTION, encode_all(records)?));
    }
    if let Some(records) = &fixture.products {
        batches.push((Product::COLLECTION, encode_all(records)?));
    }
    if let Some(records) = &fixture.sales {
        batches.push((Sale::COLLECTION, encode_all(records)?));
    }

    let unresolved = fixture.unresolved_line_items();
    if !unresolved.is_empty() {
        warn!(
            count = unresolved.len(),
            "fixture has line items referencing unknown products; they are excluded from sales reports"
        );
    }

    let mut summary = ImportSummary::default();
    for (collection, documents) in batches {
        let inserted = store.replace_collection(collection, documents).await?;
        info!(backend = store.backend(), collection, inserted, "collection imported");
        summary.collections.insert(collection.to_string(), inserted);
    }
    Ok(summary)
}

//! Report execution against a [`DocumentStore`].

use std::time::Instant;

use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::info;

use supermarket_core::CustomerId;
use supermarket_reports::report::SALES;
use supermarket_reports::{
    CategorySalesRow, DetailedSaleRow, Pipeline, ReportEnvelope, ReportKind, SaleWithProducts,
    detailed_sales, sales_by_category, sales_with_products, sales_with_products_for_customer,
};

use crate::document_store::r#trait::decode;
use crate::document_store::{DocumentStore, StoreResult};

/// Runs named reports and wraps the decoded rows in a [`ReportEnvelope`].
///
/// Read-only: every report is a single aggregation over `ventas`.
pub struct ReportRunner<S> {
    store: S,
}

impl<S> ReportRunner<S>
where
    S: DocumentStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Each sale with its resolvable products. Sales with no resolvable line
    /// item are absent.
    pub async fn sales_with_products(&self) -> StoreResult<ReportEnvelope<SaleWithProducts>> {
        self.run(ReportKind::SalesWithProducts.name(), &sales_with_products())
            .await
    }

    pub async fn sales_with_products_for_customer(
        &self,
        customer: CustomerId,
    ) -> StoreResult<ReportEnvelope<SaleWithProducts>> {
        self.run(
            ReportKind::SalesWithProducts.name(),
            &sales_with_products_for_customer(customer),
        )
        .await
    }

    pub async fn detailed_sales(&self) -> StoreResult<ReportEnvelope<DetailedSaleRow>> {
        self.run(ReportKind::DetailedSales.name(), &detailed_sales()).await
    }

    pub async fn sales_by_category(&self) -> StoreResult<ReportEnvelope<CategorySalesRow>> {
        self.run(ReportKind::SalesByCategory.name(), &sales_by_category())
            .await
    }

    #[tracing::instrument(skip(self, pipeline), fields(backend = self.store.backend(), stages = pipeline.len()))]
    async fn run<T>(&self, report: &str, pipeline: &Pipeline) -> StoreResult<ReportEnvelope<T>>
    where
        T: DeserializeOwned,
    {
        let started = Instant::now();
        let docs = self.store.aggregate(SALES, pipeline).await?;
        let rows = docs
            .into_iter()
            .map(|d| decode(report, d))
            .collect::<StoreResult<Vec<T>>>()?;
        info!(
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "report completed"
        );
        Ok(ReportEnvelope::new(report, rows, Utc::now()))
    }
}

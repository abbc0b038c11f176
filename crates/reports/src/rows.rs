//! Typed read models decoded from report output documents.
//!
//! Field names on the wire keep the stored (Spanish) names so the JSON a
//! caller sees matches what the store returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use supermarket_core::{CustomerId, Number, SaleId};

/// Resolved line item inside [`SaleWithProducts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEntry {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "precio")]
    pub price: Number,
    #[serde(rename = "cantidad")]
    pub quantity: i64,
}

/// One sale with the products of its resolvable line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleWithProducts {
    #[serde(rename = "_id")]
    pub sale_id: SaleId,
    #[serde(rename = "cliente_id")]
    pub customer_id: CustomerId,
    #[serde(rename = "fecha")]
    pub date: String,
    pub total: Number,
    /// Unordered; one entry per resolved line item.
    #[serde(rename = "productos")]
    pub products: Vec<ProductEntry>,
}

/// One resolvable line item with customer, product and category details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedSaleRow {
    pub venta_id: SaleId,
    pub fecha: String,
    pub cliente_nombre: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cliente_email: Option<String>,
    pub producto_nombre: String,
    pub categoria_nombre: String,
    pub cantidad: i64,
    pub precio_unitario: Number,
    pub subtotal: Number,
    pub total_venta: Number,
}

/// Aggregated sales for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySalesRow {
    pub categoria: String,
    /// Number of line items sold in the category.
    pub total_ventas: i64,
    pub total_cantidad: i64,
    pub total_ingresos: Number,
}

/// Report result wrapper returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEnvelope<T> {
    pub report: String,
    pub total: usize,
    pub generated_at: DateTime<Utc>,
    pub data: Vec<T>,
}

impl<T> ReportEnvelope<T> {
    pub fn new(report: impl Into<String>, data: Vec<T>, generated_at: DateTime<Utc>) -> Self {
        Self {
            report: report.into(),
            total: data.len(),
            generated_at,
            data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

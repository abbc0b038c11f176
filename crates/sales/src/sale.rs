use serde::{Deserialize, Serialize};

use supermarket_core::{
    CustomerId, DomainError, DomainResult, Entity, Number, ProductId, Record, SaleId,
};

/// Sale line: product reference and quantity purchased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "producto_id")]
    pub product_id: ProductId,
    #[serde(rename = "cantidad")]
    pub quantity: i64,
}

impl LineItem {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Sale record (`ventas` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    #[serde(rename = "_id")]
    pub id: SaleId,
    #[serde(rename = "cliente_id")]
    pub customer_id: CustomerId,
    /// Sale date as stored (ISO `YYYY-MM-DD`).
    #[serde(rename = "fecha")]
    pub date: String,
    /// Stored total; not recomputed from the line items.
    pub total: Number,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl Sale {
    pub fn new(
        id: SaleId,
        customer_id: CustomerId,
        date: impl Into<String>,
        total: impl Into<Number>,
    ) -> Self {
        Self {
            id,
            customer_id,
            date: date.into(),
            total: total.into(),
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, product_id: ProductId, quantity: i64) -> Self {
        self.items.push(LineItem::new(product_id, quantity));
        self
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Distinct product identifiers referenced by this sale, in first-seen order.
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if !ids.contains(&item.product_id) {
                ids.push(item.product_id);
            }
        }
        ids
    }
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for Sale {
    const COLLECTION: &'static str = "ventas";

    fn validate(&self) -> DomainResult<()> {
        if self.date.trim().is_empty() {
            return Err(DomainError::validation(format!("sale {} has no date", self.id)));
        }
        if !self.total.is_non_negative() {
            return Err(DomainError::validation(format!(
                "sale {} has invalid total {}",
                self.id, self.total
            )));
        }
        if let Some(item) = self.items.iter().find(|i| i.quantity <= 0) {
            return Err(DomainError::validation(format!(
                "sale {} has non-positive quantity for product {}",
                self.id, item.product_id
            )));
        }
        Ok(())
    }
}

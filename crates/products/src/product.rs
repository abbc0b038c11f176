use serde::{Deserialize, Serialize};

use supermarket_core::{
    CategoryId, DomainError, DomainResult, Entity, Number, ProductId, Record, SupplierId,
};

/// Product record (`productos` collection).
///
/// Only `_id`, `nombre` and `precio` take part in the sales join; the remaining
/// fields are carried when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(rename = "nombre")]
    pub name: String,
    /// Unit price as stored (integer or fractional currency units).
    #[serde(rename = "precio")]
    pub price: Number,
    #[serde(rename = "categoria_id", default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(rename = "proveedor_id", default, skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<SupplierId>,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, price: impl Into<Number>) -> Self {
        Self {
            id,
            name: name.into(),
            price: price.into(),
            category_id: None,
            stock: None,
            supplier_id: None,
        }
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for Product {
    const COLLECTION: &'static str = "productos";

    fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if !self.price.is_non_negative() {
            return Err(DomainError::validation(format!(
                "product {} has invalid price {}",
                self.id, self.price
            )));
        }
        if let Some(stock) = self.stock {
            if stock < 0 {
                return Err(DomainError::validation(format!(
                    "product {} has negative stock",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bread() -> Product {
        Product::new(ProductId::new(100), "Bread", 15.0)
    }

    #[test]
    fn decodes_from_stored_field_names() {
        let json = r#"{"_id":100,"nombre":"Bread","precio":15,"categoria_id":3,"stock":40,"proveedor_id":7}"#;
        let product: Product = serde_json::from_str(json).unwrap();

        assert_eq!(product.id, ProductId::new(100));
        assert_eq!(product.name, "Bread");
        assert_eq!(product.price, Number::Int(15));
        assert_eq!(product.category_id, Some(CategoryId::new(3)));
        assert_eq!(product.stock, Some(40));
        assert_eq!(product.supplier_id, Some(SupplierId::new(7)));
    }

    #[test]
    fn optional_fields_default_to_none() {
        let product: Product =
            serde_json::from_str(r#"{"_id":1,"nombre":"Milk","precio":2.5}"#).unwrap();
        assert_eq!(product.category_id, None);
        assert_eq!(product.stock, None);
        assert_eq!(product.price, Number::Double(2.5));

        let json = serde_json::to_value(&product).unwrap();
        assert!(json.get("categoria_id").is_none());
        assert_eq!(json["precio"], 2.5);
    }

    #[test]
    fn validate_accepts_well_formed_product() {
        let mut product = bread();
        product.stock = Some(3);
        assert!(product.validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_name() {
        let product = Product::new(ProductId::new(1), "   ", 1.0);
        match product.validate().unwrap_err() {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty name"),
        }
    }

    #[test]
    fn validate_rejects_negative_or_nan_price() {
        assert!(Product::new(ProductId::new(1), "X", -1.0).validate().is_err());
        assert!(Product::new(ProductId::new(1), "X", -1i64).validate().is_err());
        assert!(Product::new(ProductId::new(1), "X", f64::NAN).validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_stock() {
        let mut product = bread();
        product.stock = Some(-1);
        assert!(product.validate().is_err());
        product.stock = Some(0);
        assert!(product.validate().is_ok());
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any non-blank name with a non-negative price is valid.
            #[test]
            fn non_negative_prices_validate(
                name in "[A-Za-z][A-Za-z0-9 ]{0,40}",
                price in 0.0f64..1_000_000.0
            ) {
                let product = Product::new(ProductId::new(1), name, price);
                prop_assert!(product.validate().is_ok());
            }
        }
    }
}

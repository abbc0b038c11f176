use serde::{Deserialize, Serialize};

use supermarket_core::{CustomerId, DomainError, DomainResult, Entity, Record, SupplierId};

/// Customer record (`clientes` collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: CustomerId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Supplier record (`proveedores` collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    #[serde(rename = "_id")]
    pub id: SupplierId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "direccion", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

fn ensure_name(kind: &str, name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation(format!("{kind} name cannot be empty")));
    }
    Ok(())
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for Customer {
    const COLLECTION: &'static str = "clientes";

    fn validate(&self) -> DomainResult<()> {
        ensure_name("customer", &self.name)?;
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(DomainError::validation(format!(
                    "customer {} has malformed email",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for Supplier {
    const COLLECTION: &'static str = "proveedores";

    fn validate(&self) -> DomainResult<()> {
        ensure_name("supplier", &self.name)
    }
}

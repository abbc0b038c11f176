//! `supermarket-core` — shared building blocks for the supermarket records.
//!
//! This crate contains **pure domain** primitives (no storage concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod number;

pub use entity::{Entity, Record};
pub use error::{DomainError, DomainResult};
pub use id::{CategoryId, CustomerId, ProductId, SaleId, SupplierId};
pub use number::Number;

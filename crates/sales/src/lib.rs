//! Sales records (`ventas`).
//!
//! A sale references a customer and carries an ordered list of line items,
//! each pointing at a product by identifier. Product details are resolved by
//! the reports layer, never stored here.

pub mod sale;

pub use sale::{LineItem, Sale};

//! Parties records (customers and suppliers).
//!
//! Read-only views of the `clientes` and `proveedores` collections
//! (no IO, no storage).

pub mod party;

pub use party::{Customer, Supplier};

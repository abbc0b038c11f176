//! Product catalog records (`productos`, `categorias`).
//!
//! These are read-only views of documents owned by the database; this crate
//! only describes their shape and the invariants checked on import.

pub mod category;
pub mod product;

pub use category::Category;
pub use product::Product;

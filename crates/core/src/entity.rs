//! Entity and record traits: identity plus collection binding.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::DomainResult;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + Into<i64>;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// A record persisted in a named document collection.
///
/// Records are owned by the database; this crate only decodes, validates and
/// (for fixture import) encodes them.
pub trait Record: Entity + Serialize + DeserializeOwned + Clone + core::fmt::Debug {
    /// Name of the backing collection (e.g. `"productos"`).
    const COLLECTION: &'static str;

    /// Check record-level invariants before the record is written.
    fn validate(&self) -> DomainResult<()>;
}

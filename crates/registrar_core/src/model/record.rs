//! Identifiable record contract.
//!
//! # Responsibility
//! - Define the minimal surface a record must expose to participate in
//!   keyed lookup and registration.
//!
//! # Invariants
//! - A record's identifier is caller-assigned and immutable once persisted.
//! - `IDENTIFIER_ATTRIBUTE` names the storage attribute holding the
//!   identifier; record types may override the default convention.

use std::fmt::Display;

/// Contract for records addressable by a caller-assigned unique key.
///
/// The registrar assigns the identifier exactly once, on the creation path.
/// After a record has been staged or persisted, its identifier must never
/// change.
pub trait Identifiable {
    /// Comparable identifier type, fixed per record type.
    type Id: Clone + Eq + Display;

    /// Storage attribute name under which the identifier lives.
    ///
    /// Override per record type when the backing schema uses a different
    /// column name.
    const IDENTIFIER_ATTRIBUTE: &'static str = "identifier";

    /// Returns this record's identifier.
    fn identifier(&self) -> &Self::Id;

    /// Assigns the identifier on a freshly synthesized record.
    ///
    /// Called by the registrar creation path only.
    fn assign_identifier(&mut self, id: Self::Id);
}

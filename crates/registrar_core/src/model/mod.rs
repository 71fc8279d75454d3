//! Record contracts and concrete record models.
//!
//! # Responsibility
//! - Define the identifiable-record contract consumed by the registrar.
//! - Ship the concrete device record used by tests and call-site examples.
//!
//! # Invariants
//! - Every record is identified by a stable, caller-assigned key.
//! - Identifiers are assigned exactly once, on the creation path.

pub mod device;
pub mod record;

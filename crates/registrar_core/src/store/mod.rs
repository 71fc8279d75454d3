//! Record store collaborator surface.
//!
//! # Responsibility
//! - Define the store contract the registrar operates against: predicate
//!   fetch, pending-change staging, and commit.
//! - Keep the registrar protocol storage-agnostic behind a trait seam.
//!
//! # Invariants
//! - Fetch results observe both committed rows and records staged in the
//!   pending scope, so sequential calls on one handle read their own writes.
//! - A record's `Ref` is stable for the lifetime of the handle (or until the
//!   pending scope it lives in is committed).

use crate::model::record::Identifiable;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

pub mod sqlite;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-layer failure taxonomy.
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Opaque failure reported by a non-SQLite backend.
    Backend(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{column}` is missing from table `{table}`")
            }
            Self::Backend(message) => write!(f, "record store backend failure: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// A fetched record paired with its stable store reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Persisted<Ref, R> {
    /// Handle naming the underlying row, usable to decide "is this the same
    /// persisted record" without re-querying.
    pub reference: Ref,
    pub record: R,
}

/// Store collaborator contract.
///
/// Implementations are confined to a single logical thread or queue; no
/// method spawns concurrent work or yields mid-operation. All mutation goes
/// through the pending-change scope until `commit_pending_changes`.
pub trait RecordStore {
    type Record: Identifiable + Clone;

    /// Stable per-record handle used for conflict reporting.
    type Ref: Clone + PartialEq + Debug;

    /// Fetches records matching `attribute == id`, up to `limit` rows.
    ///
    /// Records staged in the pending scope are included when the fetch
    /// targets the identifier attribute.
    fn fetch_by_identifier(
        &self,
        attribute: &'static str,
        id: &<Self::Record as Identifiable>::Id,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Persisted<Self::Ref, Self::Record>>>;

    /// Synthesizes a new blank record instance.
    fn synthesize(&self) -> Self::Record;

    /// Places a record into the pending-change scope.
    fn stage(&self, record: Self::Record) -> StoreResult<()>;

    /// Returns whether uncommitted staged records exist.
    fn has_pending_changes(&self) -> bool;

    /// Persists all staged records, all-or-nothing.
    ///
    /// On failure the pending scope is left intact for the caller to retry
    /// or discard.
    fn commit_pending_changes(&self) -> StoreResult<()>;
}

pub type RecordOf<S> = <S as RecordStore>::Record;
pub type RefOf<S> = <S as RecordStore>::Ref;
pub type IdOf<S> = <<S as RecordStore>::Record as Identifiable>::Id;
pub type PersistedOf<S> = Persisted<RefOf<S>, RecordOf<S>>;

//! Keyed lookup, creation, and upsert over a record store.
//!
//! # Responsibility
//! - Bind one identifier and one store handle to the query/insert/upsert
//!   operations, with a caller-supplied metadata initializer for the
//!   creation path.
//!
//! # Invariants
//! - The metadata initializer runs exactly once per created record, on the
//!   creation path only; lookups never invoke it.
//! - `query` has no side effects.
//! - The query-then-create sequence is not atomic across store handles: two
//!   handles racing on the same identifier can both observe a miss and both
//!   attempt creation. The second commit then fails on the store's
//!   uniqueness constraint (surfacing as `Unexpected`) or silently
//!   duplicates when no constraint exists. Callers needing cross-handle
//!   atomicity must serialize externally or rely on a store-level
//!   constraint.

use crate::model::record::Identifiable;
use crate::store::{IdOf, PersistedOf, RecordOf, RecordStore, RefOf, StoreError};
use log::debug;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

pub type RegistrarResult<T, S> = Result<T, RegistrarError<IdOf<S>, RefOf<S>>>;

/// Whether a creating operation commits pending changes synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Leave the new record staged; committing is the caller's
    /// responsibility.
    #[default]
    Deferred,
    /// Commit pending changes before returning.
    Immediate,
}

/// Registrar failure taxonomy.
///
/// Store-layer failures are always wrapped as `Unexpected`, with the cause
/// preserved through `Error::source`.
#[derive(Debug)]
pub enum RegistrarError<Id, Ref> {
    /// Lookup matched no record. Expected and recoverable inside
    /// `insert`/`query_or_insert`; a genuine failure out of `query`.
    NotFound(Id),
    /// Creation collided with an existing record; carries the existing
    /// row's reference so the caller can resolve the conflict without
    /// re-querying.
    AlreadyExists(Ref),
    /// Opaque failure from the store layer.
    Unexpected(StoreError),
}

impl<Id: Display, Ref: Debug> Display for RegistrarError<Id, Ref> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "no record found for identifier {id}"),
            Self::AlreadyExists(reference) => {
                write!(f, "record already exists at {reference:?}")
            }
            Self::Unexpected(err) => write!(f, "{err}"),
        }
    }
}

impl<Id: Display + Debug, Ref: Debug> Error for RegistrarError<Id, Ref> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unexpected(err) => Some(err),
            _ => None,
        }
    }
}

impl<Id, Ref> From<StoreError> for RegistrarError<Id, Ref> {
    fn from(value: StoreError) -> Self {
        Self::Unexpected(value)
    }
}

/// The registrar protocol: minimal required bindings plus provided
/// default operations shared by every record type.
///
/// A registrar is a request-scoped accessor; its identifier and store
/// handle are fixed at construction. Two registrars with equal identifier
/// and store handle are observationally equivalent.
pub trait Registrar {
    type Store: RecordStore;

    /// The identifier this registrar is bound to.
    fn identifier(&self) -> &IdOf<Self::Store>;

    /// The store handle this registrar operates against.
    fn store(&self) -> &Self::Store;

    /// Creation-only hook stamping required metadata on a new record.
    ///
    /// Never invoked for records found by lookup.
    fn initialize_metadata(&self, record: &mut RecordOf<Self::Store>);

    /// Looks up the record for this registrar's identifier.
    ///
    /// Single-row-limited fetch on the record's identifier attribute.
    /// Zero matches fail with `NotFound`; store failures surface as
    /// `Unexpected`. Never creates or mutates records.
    fn query(&self) -> RegistrarResult<PersistedOf<Self::Store>, Self::Store> {
        let mut matched = self.store().fetch_by_identifier(
            <RecordOf<Self::Store> as Identifiable>::IDENTIFIER_ATTRIBUTE,
            self.identifier(),
            Some(1),
        )?;
        match matched.pop() {
            Some(found) => Ok(found),
            None => Err(RegistrarError::NotFound(self.identifier().clone())),
        }
    }

    /// Unconditionally attempts to create the record for this identifier.
    ///
    /// Fails with `AlreadyExists` (carrying the existing row's reference)
    /// when the identifier is already taken. On a miss, synthesizes a
    /// record, assigns the identifier, runs the metadata initializer once,
    /// and stages it; `SaveMode::Immediate` additionally commits pending
    /// changes before returning.
    fn insert(&self, mode: SaveMode) -> RegistrarResult<RecordOf<Self::Store>, Self::Store> {
        match self.query() {
            Ok(existing) => Err(RegistrarError::AlreadyExists(existing.reference)),
            Err(RegistrarError::NotFound(_)) => create_record(self, mode),
            Err(other) => Err(other),
        }
    }

    /// Returns the existing record, creating it first when absent.
    ///
    /// Idempotent: an existing record is returned unchanged and the
    /// metadata initializer is never reapplied. Two sequential calls
    /// against an unchanged store create at most one record and return
    /// equivalent records.
    fn query_or_insert(
        &self,
        mode: SaveMode,
    ) -> RegistrarResult<RecordOf<Self::Store>, Self::Store> {
        match self.query() {
            Ok(existing) => Ok(existing.record),
            Err(RegistrarError::NotFound(_)) => create_record(self, mode),
            Err(other) => Err(other),
        }
    }
}

fn create_record<R>(
    registrar: &R,
    mode: SaveMode,
) -> RegistrarResult<RecordOf<R::Store>, R::Store>
where
    R: Registrar + ?Sized,
{
    let store = registrar.store();
    let mut record = store.synthesize();
    record.assign_identifier(registrar.identifier().clone());
    registrar.initialize_metadata(&mut record);
    store.stage(record.clone())?;

    if mode == SaveMode::Immediate && store.has_pending_changes() {
        store.commit_pending_changes()?;
    }

    debug!(
        "event=registrar_create module=registrar status=ok identifier={} save_mode={mode:?}",
        registrar.identifier()
    );
    Ok(record)
}

/// Concrete registrar binding: identifier + store handle + initializer
/// closure.
pub struct KeyedRegistrar<'s, S, F>
where
    S: RecordStore,
    F: Fn(&mut RecordOf<S>),
{
    identifier: IdOf<S>,
    store: &'s S,
    initializer: F,
}

impl<'s, S, F> KeyedRegistrar<'s, S, F>
where
    S: RecordStore,
    F: Fn(&mut RecordOf<S>),
{
    pub fn new(identifier: IdOf<S>, store: &'s S, initializer: F) -> Self {
        Self {
            identifier,
            store,
            initializer,
        }
    }
}

impl<S, F> Registrar for KeyedRegistrar<'_, S, F>
where
    S: RecordStore,
    F: Fn(&mut RecordOf<S>),
{
    type Store = S;

    fn identifier(&self) -> &IdOf<S> {
        &self.identifier
    }

    fn store(&self) -> &S {
        self.store
    }

    fn initialize_metadata(&self, record: &mut RecordOf<S>) {
        (self.initializer)(record);
    }
}

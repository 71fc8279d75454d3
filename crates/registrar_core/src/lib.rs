//! Keyed record registration conventions over a record store.
//! This crate standardizes how records identified by a unique key are
//! looked up, created, or upserted, with creation metadata applied exactly
//! once.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod registrar;
pub mod store;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::device::{Device, DeviceId};
pub use model::record::Identifiable;
pub use query::{FetchSpec, FoundRecords, QueryOutcome, QueryRunner};
pub use registrar::{KeyedRegistrar, Registrar, RegistrarError, RegistrarResult, SaveMode};
pub use store::sqlite::{RowRef, SqliteRecord, SqliteStore};
pub use store::{
    IdOf, Persisted, PersistedOf, RecordOf, RecordStore, RefOf, StoreError, StoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Device registration record.
//!
//! # Responsibility
//! - Provide the concrete record type shipped with this crate, used to
//!   exercise the registrar protocol end to end.
//!
//! # Invariants
//! - `identifier` is stable and never reused for another device.
//! - `registered_at_ms` is stamped by the metadata initializer at creation
//!   and never rewritten afterwards.

use crate::model::record::Identifiable;
use crate::store::sqlite::SqliteRecord;
use crate::store::{StoreError, StoreResult};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a registered device.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type DeviceId = Uuid;

/// A device known to the registry, keyed by a caller-assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Device {
    /// Caller-assigned stable ID. Nil only on a freshly synthesized record
    /// that has not yet passed through identifier assignment.
    pub identifier: DeviceId,
    /// Unix epoch milliseconds of first registration. Stamped by the
    /// metadata initializer on the creation path.
    pub registered_at_ms: Option<i64>,
    /// Optional human-readable label.
    pub label: Option<String>,
}

impl Device {
    /// Creates a device with a caller-provided stable ID.
    pub fn with_id(identifier: DeviceId) -> Self {
        Self {
            identifier,
            registered_at_ms: None,
            label: None,
        }
    }

    /// Returns whether registration metadata has been stamped.
    pub fn is_registered(&self) -> bool {
        self.registered_at_ms.is_some()
    }
}

impl Identifiable for Device {
    type Id = DeviceId;

    fn identifier(&self) -> &DeviceId {
        &self.identifier
    }

    fn assign_identifier(&mut self, id: DeviceId) {
        self.identifier = id;
    }
}

impl SqliteRecord for Device {
    const TABLE: &'static str = "devices";

    // PRIMARY KEY on the identifier column is the store-level uniqueness
    // backstop for concurrent create races across handles.
    const SCHEMA_SQL: &'static str = "CREATE TABLE IF NOT EXISTS devices (
        identifier TEXT PRIMARY KEY NOT NULL,
        registered_at_ms INTEGER,
        label TEXT
    );";

    const COLUMNS: &'static [&'static str] = &["identifier", "registered_at_ms", "label"];

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let identifier_text: String = row.get("identifier")?;
        let identifier = Uuid::parse_str(&identifier_text).map_err(|_| {
            StoreError::InvalidData(format!(
                "invalid uuid value `{identifier_text}` in devices.identifier"
            ))
        })?;

        Ok(Self {
            identifier,
            registered_at_ms: row.get("registered_at_ms")?,
            label: row.get("label")?,
        })
    }

    fn to_params(&self) -> Vec<Value> {
        vec![
            Value::Text(self.identifier.to_string()),
            self.registered_at_ms.map_or(Value::Null, Value::Integer),
            self.label.clone().map_or(Value::Null, Value::Text),
        ]
    }
}

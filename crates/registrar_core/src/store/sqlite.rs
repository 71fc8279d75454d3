//! SQLite-backed record store.
//!
//! # Responsibility
//! - Implement the store collaborator contract over a rusqlite connection.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `try_new` rejects connections whose schema does not carry the record's
//!   table and required columns.
//! - Staged records live in an in-memory pending scope until commit; a
//!   commit writes all of them in one transaction or none.

use crate::model::record::Identifiable;
use crate::store::{Persisted, RecordStore, StoreError, StoreResult};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::cell::RefCell;

/// Schema binding for records persisted in a SQLite-backed store.
///
/// Identifier values are bound to SQL in their `Display` form, so the
/// identifier column should use TEXT affinity (or an affinity SQLite can
/// coerce the textual form into).
pub trait SqliteRecord: Identifiable + Clone + Default {
    /// Backing table name.
    const TABLE: &'static str;

    /// DDL creating the backing table. Should declare a PRIMARY KEY (or
    /// UNIQUE constraint) on the identifier column so concurrent create
    /// races surface as constraint violations instead of duplicates.
    const SCHEMA_SQL: &'static str;

    /// Column names, in the order `to_params` produces values.
    const COLUMNS: &'static [&'static str];

    /// Decodes one fetched row.
    fn from_row(row: &Row<'_>) -> StoreResult<Self>;

    /// Encodes this record as column values aligned with `COLUMNS`.
    fn to_params(&self) -> Vec<Value>;
}

/// Stable handle naming one record held by a [`SqliteStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowRef {
    /// Committed row, addressed by SQLite rowid.
    Row(i64),
    /// Staged record not yet committed, addressed by pending-scope position.
    /// Invalidated when the pending scope is committed or discarded.
    Pending(usize),
}

/// SQLite-backed store handle for one record type.
pub struct SqliteStore<'conn, R: SqliteRecord> {
    conn: &'conn Connection,
    pending: RefCell<Vec<R>>,
}

impl<'conn, R: SqliteRecord> SqliteStore<'conn, R> {
    /// Applies the record's schema DDL on the connection.
    pub fn initialize(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(R::SCHEMA_SQL)?;
        Ok(())
    }

    /// Builds a store handle after validating the connection's schema.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        validate_schema::<R>(conn)?;
        Ok(Self {
            conn,
            pending: RefCell::new(Vec::new()),
        })
    }

    /// Drops all staged records without persisting them.
    pub fn discard_pending_changes(&self) {
        self.pending.borrow_mut().clear();
    }

    /// Number of staged, uncommitted records.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl<R: SqliteRecord> RecordStore for SqliteStore<'_, R> {
    type Record = R;
    type Ref = RowRef;

    fn fetch_by_identifier(
        &self,
        attribute: &'static str,
        id: &R::Id,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Persisted<RowRef, R>>> {
        if !R::COLUMNS.contains(&attribute) {
            return Err(StoreError::MissingRequiredColumn {
                table: R::TABLE,
                column: attribute,
            });
        }

        let mut sql = format!(
            "SELECT rowid, {} FROM {} WHERE {} = ?1",
            R::COLUMNS.join(", "),
            R::TABLE,
            attribute
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut matched = Vec::new();
        while let Some(row) = rows.next()? {
            let rowid: i64 = row.get(0)?;
            matched.push(Persisted {
                reference: RowRef::Row(rowid),
                record: R::from_row(row)?,
            });
        }

        // Staged records are only addressable by identifier; fetches on
        // other attributes see committed rows alone.
        if attribute == R::IDENTIFIER_ATTRIBUTE {
            let pending = self.pending.borrow();
            for (position, record) in pending.iter().enumerate() {
                if record.identifier() == id {
                    matched.push(Persisted {
                        reference: RowRef::Pending(position),
                        record: record.clone(),
                    });
                }
            }
        }

        if let Some(limit) = limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    fn synthesize(&self) -> R {
        R::default()
    }

    fn stage(&self, record: R) -> StoreResult<()> {
        self.pending.borrow_mut().push(record);
        Ok(())
    }

    fn has_pending_changes(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    fn commit_pending_changes(&self) -> StoreResult<()> {
        let staged: Vec<R> = self.pending.borrow().clone();
        if staged.is_empty() {
            return Ok(());
        }

        let placeholders = (1..=R::COLUMNS.len())
            .map(|position| format!("?{position}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            R::TABLE,
            R::COLUMNS.join(", "),
            placeholders
        );

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in &staged {
                stmt.execute(params_from_iter(record.to_params()))?;
            }
        }
        tx.commit()?;

        self.pending.borrow_mut().clear();
        debug!(
            "event=store_commit module=store status=ok table={} rows={}",
            R::TABLE,
            staged.len()
        );
        Ok(())
    }
}

fn validate_schema<R: SqliteRecord>(conn: &Connection) -> StoreResult<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", R::TABLE))?;
    let mut rows = stmt.query([])?;
    let mut present = Vec::new();
    while let Some(row) = rows.next()? {
        present.push(row.get::<_, String>(1)?);
    }

    if present.is_empty() {
        return Err(StoreError::MissingRequiredTable(R::TABLE));
    }
    for &column in R::COLUMNS {
        if !present.iter().any(|name| name.as_str() == column) {
            return Err(StoreError::MissingRequiredColumn {
                table: R::TABLE,
                column,
            });
        }
    }
    Ok(())
}

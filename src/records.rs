//!
//! medplus record manager
//! ----------------------
//! Generic List/Add/Edit/Delete over the tables enumerated in the registry.
//! A `RecordSession` is created per open editor and holds the table's schema
//! plus a cache of the last List result, which is how Edit/Delete targets are
//! resolved without re-querying storage. Every operation is gated on the
//! table's permission set before any backend call is made, and every
//! successful mutation refreshes the cache with a full re-List so the cached
//! view never disagrees with the backend about the row just mutated.
//!
//! All identifiers interpolated into query strings come from the static
//! registry, never from caller input; caller-supplied data travels as
//! positional parameters.

use std::iter::once;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::registry::{self, Operation, TableSchema};
use crate::storage::Storage;

/// One row of a table: an ordered column-to-value snapshot. The identifying
/// key is always at position 0 regardless of table; edits produce a new
/// persisted version rather than mutating a snapshot in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// The identifying key value (first projected column).
    pub fn key(&self) -> &Value {
        &self.fields[0].1
    }

    /// Look up a cell by storage column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    /// Values of the editable columns, in schema order (key excluded).
    pub fn display_values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().skip(1).map(|(_, v)| v)
    }
}

/// Transient per-editor controller. Created by [`RecordManager::open`],
/// refreshed after every successful mutation, discarded when the editor
/// closes. There is no cross-session shared mutable state.
pub struct RecordSession {
    schema: &'static TableSchema,
    storage: Arc<dyn Storage>,
    cache: Vec<Record>,
}

impl std::fmt::Debug for RecordSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSession")
            .field("schema", &self.schema)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl RecordSession {
    pub fn schema(&self) -> &'static TableSchema {
        self.schema
    }

    /// The cached last List result (empty until the first `list` call).
    pub fn records(&self) -> &[Record] {
        &self.cache
    }

    pub fn into_records(self) -> Vec<Record> {
        self.cache
    }

    /// Read all rows, projecting the key column followed by the editable
    /// columns in schema order. The cache is replaced only by a fully
    /// converted result; on any failure it is left untouched.
    pub fn list(&mut self) -> AppResult<&[Record]> {
        let rows = self.storage.fetch_all(&select_sql(self.schema), &[])?;
        let width = self.schema.display_columns.len() + 1;
        let mut fresh: Vec<Record> = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != width {
                return Err(AppError::storage(
                    "row_shape",
                    format!(
                        "list {}: expected {} columns per row, got {}",
                        self.schema.table_id,
                        width,
                        row.len()
                    ),
                ));
            }
            let fields = once(self.schema.key_column)
                .chain(self.schema.storage_columns())
                .map(str::to_string)
                .zip(row)
                .collect();
            fresh.push(Record { fields });
        }
        self.cache = fresh;
        debug!(target: "medplus::records", "list: table='{}' rows={}", self.schema.table_id, self.cache.len());
        Ok(&self.cache)
    }

    /// Insert one row from values matching `display_columns` in schema
    /// order, then re-List and return the inserted record.
    pub fn add(&mut self, values: &[Value]) -> AppResult<Record> {
        self.require(Operation::Add)?;
        self.validate_values(values)?;
        let affected = self.storage.execute(&insert_sql(self.schema), values)?;
        if affected == 0 {
            return Err(AppError::storage(
                "insert_failed",
                format!("add {}: backend reported no inserted row", self.schema.table_id),
            ));
        }
        self.list()?;
        // The backend stays the source of truth: locate the inserted row in
        // the fresh list, scanning from the tail where the newest row lands.
        self.cache
            .iter()
            .rev()
            .find(|r| r.display_values().eq(values.iter()))
            .cloned()
            .ok_or_else(|| {
                AppError::internal(
                    "insert_vanished",
                    format!("add {}: inserted row not present after refresh", self.schema.table_id),
                )
            })
    }

    /// Update a single named field of the record identified by `key`.
    pub fn edit(&mut self, key: &Value, field: &str, new_value: &Value) -> AppResult<Record> {
        self.require(Operation::Edit)?;
        let col = self.schema.display_column(field).ok_or_else(|| {
            AppError::validation(
                "unknown_field",
                format!("edit {}: '{}' is not an editable column", self.schema.table_id, field),
            )
        })?;
        if is_blank(new_value) {
            return Err(AppError::validation(
                "empty_value",
                format!("edit {}: {} requires a value", self.schema.table_id, col.label),
            ));
        }
        self.resolve_key(Operation::Edit, key)?;
        let affected = self.storage.execute(
            &update_sql(self.schema, col.storage_column),
            &[new_value.clone(), key.clone()],
        )?;
        if affected == 0 {
            // The row vanished between the cached List and this update.
            return Err(self.missing_key(Operation::Edit, key));
        }
        self.list()?;
        debug!(target: "medplus::records", "edit: table='{}' key={} field='{}'", self.schema.table_id, key_display(key), col.storage_column);
        self.cache
            .iter()
            .find(|r| r.key() == key)
            .cloned()
            .ok_or_else(|| self.missing_key(Operation::Edit, key))
    }

    /// Delete the record identified by `key`. Deleting an already-absent key
    /// is not success: zero affected rows maps to `NotFound`.
    pub fn delete(&mut self, key: &Value) -> AppResult<()> {
        self.require(Operation::Delete)?;
        self.resolve_key(Operation::Delete, key)?;
        let affected = self.storage.execute(&delete_sql(self.schema), &[key.clone()])?;
        if affected == 0 {
            return Err(self.missing_key(Operation::Delete, key));
        }
        self.list()?;
        debug!(target: "medplus::records", "delete: table='{}' key={}", self.schema.table_id, key_display(key));
        Ok(())
    }

    fn require(&self, op: Operation) -> AppResult<()> {
        if self.schema.allows(op) {
            Ok(())
        } else {
            Err(AppError::permission_denied(
                "op_disabled",
                format!("{} is disabled for table '{}'", op, self.schema.table_id),
            ))
        }
    }

    fn resolve_key(&self, op: Operation, key: &Value) -> AppResult<()> {
        if self.cache.iter().any(|r| r.key() == key) {
            Ok(())
        } else {
            Err(self.missing_key(op, key))
        }
    }

    fn missing_key(&self, op: Operation, key: &Value) -> AppError {
        AppError::not_found(
            "no_such_key",
            format!(
                "{} {}: key {} does not match any listed record",
                op,
                self.schema.table_id,
                key_display(key)
            ),
        )
    }

    fn validate_values(&self, values: &[Value]) -> AppResult<()> {
        let expected = self.schema.display_columns.len();
        if values.len() != expected {
            return Err(AppError::validation(
                "arity_mismatch",
                format!(
                    "add {}: expected {} values, got {}",
                    self.schema.table_id,
                    expected,
                    values.len()
                ),
            ));
        }
        for (col, v) in self.schema.display_columns.iter().zip(values) {
            if is_blank(v) {
                return Err(AppError::validation(
                    "empty_value",
                    format!("add {}: {} requires a value", self.schema.table_id, col.label),
                ));
            }
        }
        Ok(())
    }
}

/// Stateless-per-invocation entry point. Holds the storage handle (lifecycle
/// owned by the caller) and opens per-editor sessions against it.
pub struct RecordManager {
    storage: Arc<dyn Storage>,
}

impl RecordManager {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Open a session for a registered table. The cache starts empty; the
    /// caller issues the first `list`.
    pub fn open(&self, table_id: &str) -> AppResult<RecordSession> {
        let schema = registry::resolve(table_id)?;
        Ok(RecordSession {
            schema,
            storage: Arc::clone(&self.storage),
            cache: Vec::new(),
        })
    }

    /// One-shot List for callers that do not hold an editor open.
    pub fn list(&self, table_id: &str) -> AppResult<Vec<Record>> {
        let mut session = self.open(table_id)?;
        session.list()?;
        Ok(session.into_records())
    }

    /// One-shot Add. The permission gate runs before any storage call.
    pub fn add(&self, table_id: &str, values: &[Value]) -> AppResult<Record> {
        let mut session = self.open(table_id)?;
        session.add(values)
    }

    /// One-shot Edit. Permission is checked before the key-resolving List.
    pub fn edit(&self, table_id: &str, key: &Value, field: &str, new_value: &Value) -> AppResult<Record> {
        let mut session = self.open(table_id)?;
        session.require(Operation::Edit)?;
        session.list()?;
        session.edit(key, field, new_value)
    }

    /// One-shot Delete. Permission is checked before the key-resolving List.
    pub fn delete(&self, table_id: &str, key: &Value) -> AppResult<()> {
        let mut session = self.open(table_id)?;
        session.require(Operation::Delete)?;
        session.list()?;
        session.delete(key)
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn key_display(key: &Value) -> String {
    match key {
        Value::String(s) => format!("'{}'", s),
        other => other.to_string(),
    }
}

fn select_sql(schema: &TableSchema) -> String {
    let cols: Vec<&str> = schema.storage_columns().collect();
    format!(
        "SELECT {}, {} FROM {}",
        schema.key_column,
        cols.join(", "),
        schema.table_id
    )
}

fn insert_sql(schema: &TableSchema) -> String {
    let cols: Vec<&str> = schema.storage_columns().collect();
    let placeholders = vec!["?"; cols.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        schema.table_id,
        cols.join(", "),
        placeholders
    )
}

fn update_sql(schema: &TableSchema, column: &str) -> String {
    format!(
        "UPDATE {} SET {} = ? WHERE {} = ?",
        schema.table_id, column, schema.key_column
    )
}

fn delete_sql(schema: &TableSchema) -> String {
    format!("DELETE FROM {} WHERE {} = ?", schema.table_id, schema.key_column)
}

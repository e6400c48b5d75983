//!
//! medplus storage module
//! ----------------------
//! This module implements the storage collaborator consumed by the record
//! manager and the identity provider. The surface is deliberately small: a
//! `Storage` trait exposing `fetch_all` for reads and `execute` for writes,
//! both taking a SQL string plus positional parameters and speaking
//! `serde_json::Value` cells so numeric and string keys coexist.
//!
//! The shipped implementation is `SqliteStorage`, an embedded SQLite database
//! behind a `parking_lot::Mutex`. Opening it bootstraps the four application
//! tables with `CREATE TABLE IF NOT EXISTS`, so a fresh database file is
//! usable immediately. Calls are blocking; the caller owns the handle's
//! lifecycle and there is no pooling or reconnection logic.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, ToSql};
use serde_json::Value;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Blocking storage primitives. The record manager is the sole translator
/// from logical operations to these two calls; query strings never cross the
/// caller-facing API.
pub trait Storage: Send + Sync {
    /// Run a read query and return all rows, cells in projection order.
    fn fetch_all(&self, query: &str, params: &[Value]) -> AppResult<Vec<Vec<Value>>>;

    /// Run a write statement and return the affected row count.
    fn execute(&self, query: &str, params: &[Value]) -> AppResult<usize>;
}

const BOOTSTRAP_DDL: &str = "
CREATE TABLE IF NOT EXISTS hospitals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    contact TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS personal_contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    contact_no TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS emergency_contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    contact_no TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
";

/// Embedded SQLite database. Cloneable via `Arc` by callers; internally a
/// single connection guarded by a mutex, matching the single-active-editor
/// model of the client.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (creating if needed) a database file and bootstrap the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        debug!(target: "medplus::storage", "open: path='{}'", path.display());
        let conn = Connection::open(path).map_err(map_sqlite_err)?;
        Self::bootstrap(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open a private in-memory database. Used by tests and demos.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory().map_err(map_sqlite_err)?;
        Self::bootstrap(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn bootstrap(conn: &Connection) -> AppResult<()> {
        conn.execute_batch(BOOTSTRAP_DDL).map_err(map_sqlite_err)?;
        debug!(target: "medplus::storage", "bootstrap: schema ensured");
        Ok(())
    }
}

impl Storage for SqliteStorage {
    fn fetch_all(&self, query: &str, params: &[Value]) -> AppResult<Vec<Vec<Value>>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(query).map_err(map_sqlite_err)?;
        let ncols = stmt.column_count();
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter().map(SqlParam)))
            .map_err(map_sqlite_err)?;
        let mut out: Vec<Vec<Value>> = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqlite_err)? {
            let mut cells = Vec::with_capacity(ncols);
            for i in 0..ncols {
                cells.push(cell_from_sql(row.get_ref(i).map_err(map_sqlite_err)?));
            }
            out.push(cells);
        }
        Ok(out)
    }

    fn execute(&self, query: &str, params: &[Value]) -> AppResult<usize> {
        let conn = self.conn.lock();
        conn.execute(query, rusqlite::params_from_iter(params.iter().map(SqlParam)))
            .map_err(map_sqlite_err)
    }
}

fn map_sqlite_err(e: rusqlite::Error) -> AppError {
    AppError::storage("sqlite", e.to_string())
}

/// Positional parameter adapter from JSON values to SQLite bindings.
struct SqlParam<'a>(&'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let out = match self.0 {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Integer(*b as i64),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    SqlValue::Real(f)
                } else {
                    SqlValue::Null
                }
            }
            Value::String(s) => SqlValue::Text(s.clone()),
            // Arrays/objects are stored as their JSON text form.
            other => SqlValue::Text(other.to_string()),
        };
        Ok(ToSqlOutput::Owned(out))
    }
}

fn cell_from_sql(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}

#[cfg(test)]
mod storage_tests;

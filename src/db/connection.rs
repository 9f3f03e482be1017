//! SQLite connection manager.
//!
//! A single connection is shared behind a mutex. Each query materializes
//! every row before the lock is released, so concurrent readers never see
//! an interleaved result set.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;
use tracing::{error, info};

use crate::error::{NlqError, Result};

/// Rows plus the column names in statement order.
#[derive(Debug, Clone)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, Value>>,
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the SQLite database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| NlqError::Execution(format!("Failed to open database: {}", e)))?;
        info!("Opened inventory database at {}", path.as_ref().display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Execute a query and return all rows as name-to-value maps.
    pub fn query(&self, sql: &str) -> Result<RowSet> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| NlqError::Execution("Database lock poisoned".to_string()))?;

        let mut stmt = conn.prepare(sql).map_err(|e| {
            error!("Failed to prepare query: {}", e);
            NlqError::Execution(format!("Failed to prepare query: {}", e))
        })?;

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut rows = Vec::new();
        let mut raw = stmt
            .query([])
            .map_err(|e| NlqError::Execution(format!("Query failed: {}", e)))?;

        while let Some(row) = raw
            .next()
            .map_err(|e| NlqError::Execution(format!("Row fetch failed: {}", e)))?
        {
            let mut map = serde_json::Map::new();
            for (idx, name) in columns.iter().enumerate() {
                let value = row
                    .get_ref(idx)
                    .map_err(|e| NlqError::Execution(format!("Column read failed: {}", e)))?;
                map.insert(name.clone(), value_to_json(value));
            }
            rows.push(map);
        }

        Ok(RowSet { columns, rows })
    }
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("{:?}", b)),
    }
}

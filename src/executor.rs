//! Read-only query execution with safety validation.
//!
//! This is the single enforcement point for the read-only contract: every
//! statement is validated here regardless of which generator produced it
//! and regardless of what the critique stage reported.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::db::Database;
use crate::dialect;
use crate::error::{NlqError, Result};
use crate::schema::RESULT_COLUMNS;

lazy_static! {
    // Whole-word match only: a column named updated_at must not trip UPDATE.
    static ref FORBIDDEN_KEYWORD: Regex =
        Regex::new(r"(?i)\b(DROP|DELETE|UPDATE|INSERT|ALTER|CREATE|TRUNCATE)\b").unwrap();
}

/// Rows mapped to the canonical camelCase field set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub rows: Vec<serde_json::Map<String, Value>>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

pub struct QueryExecutor {
    db: Arc<Database>,
    query_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(db: Arc<Database>, query_timeout: Duration) -> Self {
        Self { db, query_timeout }
    }

    /// Check the read-only contract without touching the store. The
    /// case-folded copy is used for inspection only.
    pub fn validate(sql: &str) -> Result<()> {
        let normalized = sql.trim().to_uppercase();

        if !normalized.starts_with("SELECT") {
            return Err(NlqError::Validation(
                "Only SELECT queries are allowed".to_string(),
            ));
        }

        if let Some(keyword) = FORBIDDEN_KEYWORD.find(&normalized) {
            return Err(NlqError::Validation(format!(
                "Query contains forbidden keyword: {}",
                keyword.as_str()
            )));
        }

        Ok(())
    }

    /// Execute a read-only SQL query against the inventory database.
    pub async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();
        info!("Executing inventory query: {}", sql);

        Self::validate(sql)?;

        let sqlite_sql = dialect::to_sqlite(sql.trim());

        let db = Arc::clone(&self.db);
        let task = tokio::task::spawn_blocking(move || db.query(&sqlite_sql));
        let row_set = match tokio::time::timeout(self.query_timeout, task).await {
            Ok(joined) => joined
                .map_err(|e| NlqError::Execution(format!("Query task failed: {}", e)))??,
            Err(_) => {
                error!("Query timed out after {:?}", self.query_timeout);
                return Err(NlqError::Execution(format!(
                    "Query timed out after {}s",
                    self.query_timeout.as_secs()
                )));
            }
        };

        let rows: Vec<_> = row_set.rows.iter().map(map_row).collect();
        let row_count = rows.len();
        let execution_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "Query executed successfully: {} rows in {}ms",
            row_count, execution_time_ms
        );

        Ok(QueryResult {
            rows,
            row_count,
            execution_time_ms,
        })
    }
}

/// Shape a raw store row into the canonical field set. Either naming
/// convention is accepted per field, camelCase winning when both are
/// present; absent numeric fields default to zero, the rest to null.
fn map_row(row: &serde_json::Map<String, Value>) -> serde_json::Map<String, Value> {
    let mut mapped = serde_json::Map::new();

    for column in RESULT_COLUMNS {
        let value = row
            .get(column.camel)
            .filter(|v| !v.is_null())
            .or_else(|| row.get(column.snake).filter(|v| !v.is_null()))
            .cloned();

        let value = match value {
            Some(v) => v,
            None if column.numeric => Value::from(0),
            None => Value::Null,
        };

        mapped.insert(column.camel.to_string(), value);
    }

    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use tempfile::TempDir;

    fn seeded_executor(dir: &TempDir) -> QueryExecutor {
        let path = dir.path().join("inventory.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE inventory_items (
                id TEXT PRIMARY KEY,
                sku TEXT NOT NULL,
                name TEXT NOT NULL,
                category_id TEXT,
                location_id TEXT,
                current_stock INTEGER DEFAULT 0,
                reorder_threshold INTEGER DEFAULT 0,
                recent_sales_volume INTEGER DEFAULT 0,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO inventory_items
                (id, sku, name, category_id, location_id, current_stock, reorder_threshold, recent_sales_volume)
            VALUES
                ('item-1', 'ELEC-001', 'Laptop Computer', 'cat-1', 'loc-1', 50, 20, 150),
                ('item-2', 'ELEC-002', 'Smartphone', 'cat-1', 'loc-1', 30, 15, 200),
                ('item-3', 'ELEC-003', 'Tablet', 'cat-1', 'loc-2', 10, 10, 80);",
        )
        .unwrap();
        drop(conn);

        let db = Arc::new(Database::open(&path).unwrap());
        QueryExecutor::new(db, Duration::from_secs(5))
    }

    #[test]
    fn test_validate_rejects_non_select() {
        let err = QueryExecutor::validate("DELETE FROM inventory_items").unwrap_err();
        assert!(matches!(err, NlqError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_denylisted_keyword_anywhere() {
        let err =
            QueryExecutor::validate("SELECT * FROM inventory_items; DROP TABLE inventory_items")
                .unwrap_err();
        assert!(matches!(err, NlqError::Validation(_)));
        assert!(err.to_string().contains("DROP"));
    }

    #[test]
    fn test_validate_allows_keyword_inside_identifier() {
        // updated_at contains UPDATE, created_at contains CREATE
        QueryExecutor::validate(
            "SELECT updated_at, created_at FROM inventory_items ORDER BY updated_at DESC",
        )
        .unwrap();
    }

    #[test]
    fn test_validate_is_case_insensitive() {
        let err = QueryExecutor::validate("select * from x; drop table x").unwrap_err();
        assert!(matches!(err, NlqError::Validation(_)));

        QueryExecutor::validate("  select 1").unwrap();
    }

    #[test]
    fn test_map_row_prefers_camel_case() {
        let mut row = serde_json::Map::new();
        row.insert("currentStock".to_string(), Value::from(7));
        row.insert("current_stock".to_string(), Value::from(99));
        row.insert("category_id".to_string(), Value::from("cat-1"));

        let mapped = map_row(&row);

        assert_eq!(mapped["currentStock"], 7);
        assert_eq!(mapped["categoryId"], "cat-1");
        assert!(!mapped.contains_key("current_stock"));
    }

    #[test]
    fn test_map_row_defaults() {
        let row = serde_json::Map::new();
        let mapped = map_row(&row);

        assert_eq!(mapped["currentStock"], 0);
        assert_eq!(mapped["reorderThreshold"], 0);
        assert_eq!(mapped["recentSalesVolume"], 0);
        assert!(mapped["id"].is_null());
        assert!(mapped["createdAt"].is_null());
    }

    #[tokio::test]
    async fn test_execute_query_maps_rows() {
        let dir = TempDir::new().unwrap();
        let executor = seeded_executor(&dir);

        let result = executor
            .execute_query(
                "SELECT id, sku, name, current_stock, reorder_threshold, recent_sales_volume
                 FROM inventory_items ORDER BY recent_sales_volume DESC LIMIT 2",
            )
            .await
            .unwrap();

        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows[0]["name"], "Smartphone");
        assert_eq!(result.rows[0]["currentStock"], 30);
        // columns not selected come back defaulted
        assert!(result.rows[0]["categoryId"].is_null());
    }

    #[tokio::test]
    async fn test_execute_query_rejects_delete_without_store_call() {
        let dir = TempDir::new().unwrap();
        let executor = seeded_executor(&dir);

        let err = executor
            .execute_query("DELETE FROM inventory_items")
            .await
            .unwrap_err();
        assert!(matches!(err, NlqError::Validation(_)));

        // nothing was deleted
        let result = executor
            .execute_query("SELECT id FROM inventory_items")
            .await
            .unwrap();
        assert_eq!(result.row_count, 3);
    }

    #[tokio::test]
    async fn test_execute_query_store_error_is_execution() {
        let dir = TempDir::new().unwrap();
        let executor = seeded_executor(&dir);

        let err = executor
            .execute_query("SELECT * FROM missing_table")
            .await
            .unwrap_err();
        assert!(matches!(err, NlqError::Execution(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_execute_query_normalizes_dialect() {
        let dir = TempDir::new().unwrap();
        let executor = seeded_executor(&dir);

        let result = executor
            .execute_query(r#"SELECT id, current_stock as "currentStock" FROM inventory_items LIMIT 1"#)
            .await
            .unwrap();

        assert_eq!(result.row_count, 1);
        assert!(result.rows[0]["currentStock"].is_number());
    }
}

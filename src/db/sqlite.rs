//! SQLite database client implementation.
//!
//! Used for local development and tests. Statements run inside a
//! transaction that is rolled back; SQLite has no server-side statement
//! timeout, so the executor's deadline is the only bound.

use crate::config::DatabaseConfig;
use crate::db::{ColumnInfo, DatabaseBackend, DatabaseClient, QueryResult, Row, Value};
use crate::error::{InsightError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens the database named by the URL.
    ///
    /// In-memory databases live only as long as their connection, so they
    /// get a single connection that is never recycled.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| InsightError::config(format!("Invalid SQLite URL: {e}")))?;

        let in_memory = config.url.contains(":memory:") || config.url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| InsightError::connection(format!("Cannot open SQLite database: {e}")))?;

        debug!("Opened {}", config.display_string());
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let mut tx = self.pool.begin().await.map_err(map_runtime_error)?;
        let fetched = sqlx::query(sql).fetch_all(&mut *tx).await;
        if let Err(e) = tx.rollback().await {
            warn!("Rollback after query failed: {e}");
        }

        let sqlite_rows = fetched.map_err(map_runtime_error)?;
        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = sqlite_rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let rows: Vec<Row> = sqlite_rows.iter().map(convert_row).collect();

        Ok(QueryResult::with_data(columns, rows).with_execution_time(execution_time))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_runtime_error)
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes by the value's storage class, refined by the declared column type.
///
/// SQLite is dynamically typed: `SUM(total_sales)` has no declared type, and
/// a `DATE` column stores TEXT.
fn convert_value(row: &SqliteRow, index: usize, declared: &str) -> Value {
    let storage = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };
    let declared = declared.to_uppercase();

    match storage.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => {
            match row.try_get_unchecked::<i64, _>(index) {
                Ok(v) if declared == "BOOLEAN" => Value::Bool(v != 0),
                Ok(v) => Value::Int(v),
                Err(_) => Value::Null,
            }
        }
        "REAL" | "NUMERIC" => row
            .try_get_unchecked::<f64, _>(index)
            .map(Value::Float)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(hex_literal(&bytes)))
            .unwrap_or(Value::Null),
        _ => match row.try_get_unchecked::<String, _>(index) {
            Ok(text) => parse_declared_text(text, &declared),
            Err(_) => Value::Null,
        },
    }
}

/// Interprets TEXT stored in DATE or DATETIME columns; other text is kept.
fn parse_declared_text(text: String, declared: &str) -> Value {
    match declared {
        "DATE" => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map(Value::Date)
            .unwrap_or(Value::String(text)),
        "DATETIME" | "TIMESTAMP" => parse_datetime(&text)
            .map(Value::DateTime)
            .unwrap_or(Value::String(text)),
        _ => Value::String(text),
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text.trim_end_matches('Z'), fmt).ok())
}

fn hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn map_runtime_error(error: sqlx::Error) -> InsightError {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => InsightError::connection(error.to_string()),
        sqlx::Error::Database(db_error) => InsightError::query(db_error.message().to_string()),
        other => InsightError::query(other.to_string()),
    }
}

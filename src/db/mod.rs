//! Database abstraction layer for shopinsight.
//!
//! Provides a trait-based interface over the metrics store so PostgreSQL,
//! SQLite and test doubles can be used interchangeably.

mod mock;
mod postgres;
pub mod seed;
mod sqlite;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use postgres::PostgresClient;
pub use seed::SeedTarget;
pub use sqlite::SqliteClient;
pub use types::{ColumnInfo, QueryResult, Records, Row, Value};

use crate::config::DatabaseConfig;
use crate::error::{InsightError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Postgres,
    #[default]
    Sqlite,
}

impl DatabaseBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Selects the backend from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self> {
        let lower = url.trim().to_ascii_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else if lower.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else {
            Err(InsightError::config(format!(
                "Unsupported database URL '{}'. Expected postgres://, postgresql:// or sqlite:",
                url.split(':').next().unwrap_or(url)
            )))
        }
    }

    /// Returns the name used in prompts to describe the SQL dialect.
    pub fn dialect_name(&self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::Sqlite => "SQLite",
        }
    }
}

impl std::fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connected store, before it is type-erased for the pipeline.
///
/// Seeding needs the concrete pool, everything else goes through
/// [`DatabaseClient`].
#[derive(Debug)]
pub enum Database {
    Postgres(PostgresClient),
    Sqlite(SqliteClient),
}

impl Database {
    pub fn backend(&self) -> DatabaseBackend {
        match self {
            Self::Postgres(_) => DatabaseBackend::Postgres,
            Self::Sqlite(_) => DatabaseBackend::Sqlite,
        }
    }

    /// Borrows the underlying pool for schema creation and seeding.
    pub fn seed_target(&self) -> SeedTarget<'_> {
        match self {
            Self::Postgres(c) => SeedTarget::Postgres(c.pool()),
            Self::Sqlite(c) => SeedTarget::Sqlite(c.pool()),
        }
    }

    pub fn into_client(self) -> Arc<dyn DatabaseClient> {
        match self {
            Self::Postgres(c) => Arc::new(c),
            Self::Sqlite(c) => Arc::new(c),
        }
    }
}

/// Connects to the store named by the configuration URL.
///
/// This is the central factory function for database connections.
pub async fn connect(config: &DatabaseConfig) -> Result<Database> {
    match config.backend()? {
        DatabaseBackend::Postgres => Ok(Database::Postgres(PostgresClient::connect(config).await?)),
        DatabaseBackend::Sqlite => Ok(Database::Sqlite(SqliteClient::connect(config).await?)),
    }
}

/// Trait defining the interface for database clients.
///
/// `execute_query` runs inside a transaction that is always rolled back, so
/// nothing a statement does can persist.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    fn backend(&self) -> DatabaseBackend;

    /// Executes a SQL statement and returns every row it produces.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Closes the connection pool.
    async fn close(&self) -> Result<()>;
}

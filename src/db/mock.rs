//! Mock database clients for testing.
//!
//! `MockDatabaseClient` returns a canned result and records every statement
//! it receives; `FailingDatabaseClient` always fails with a given error.

use super::{DatabaseBackend, DatabaseClient, QueryResult};
use crate::error::{InsightError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mock database client that returns a predefined result.
///
/// Clones share the statement log.
#[derive(Debug, Clone, Default)]
pub struct MockDatabaseClient {
    result: QueryResult,
    delay: Option<Duration>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl MockDatabaseClient {
    /// Creates a mock that returns an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock that returns the given result for every statement.
    pub fn with_result(result: QueryResult) -> Self {
        Self {
            result,
            ..Self::default()
        }
    }

    /// Makes every statement take at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn execution_count(&self) -> usize {
        self.executed.lock().map(|log| log.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut log) = self.executed.lock() {
            log.push(sql.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.result.clone())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A database client whose every call fails with the same error.
#[derive(Debug, Clone)]
pub struct FailingDatabaseClient {
    error: InsightError,
}

impl FailingDatabaseClient {
    pub fn new(error: InsightError) -> Self {
        Self { error }
    }

    /// A store that cannot be reached.
    pub fn unreachable() -> Self {
        Self::new(InsightError::connection("Cannot connect to localhost:5432"))
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Err(self.error.clone())
    }

    async fn ping(&self) -> Result<()> {
        Err(self.error.clone())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

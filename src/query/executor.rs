//! Checked, read-only execution of candidate statements.
//!
//! The executor is the one safety-critical gate: the model is told to emit
//! only SELECT statements, but nothing reaches the store until the
//! read-only policy has accepted it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::db::{DatabaseClient, QueryResult};
use crate::error::{ExecutionError, InsightError};
use crate::safety::ReadOnlyPolicy;

use super::SqlCandidate;

/// Checks and runs candidate statements against the store.
#[derive(Clone)]
pub struct QueryExecutor {
    db: Arc<dyn DatabaseClient>,
    policy: ReadOnlyPolicy,
    timeout: Duration,
}

impl QueryExecutor {
    /// Creates an executor whose policy uses the store's SQL dialect.
    pub fn new(db: Arc<dyn DatabaseClient>, timeout: Duration) -> Self {
        let policy = ReadOnlyPolicy::new(db.backend());
        Self {
            db,
            policy,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Checks the candidate, then executes it and materializes every row.
    ///
    /// Rejected candidates never reach the store. Nothing is retried.
    pub async fn execute(&self, candidate: SqlCandidate) -> Result<QueryResult, ExecutionError> {
        let sql = candidate.into_inner();

        let statement = self.policy.check(&sql).map_err(|e| {
            warn!(reason = e.reason(), "Rejected generated SQL: {e}");
            e
        })?;

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.db.execute_query(&statement)).await;

        let result = match outcome {
            Err(_) => {
                warn!("Statement exceeded {:?}", self.timeout);
                return Err(ExecutionError::Timeout(self.timeout));
            }
            Ok(result) => result.map_err(|e| self.map_error(e))?,
        };

        debug!(
            rows = result.row_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Statement executed"
        );
        Ok(result)
    }

    fn map_error(&self, error: InsightError) -> ExecutionError {
        match error {
            InsightError::Connection(msg) => ExecutionError::ConnectionLost(msg),
            InsightError::Timeout(_) => ExecutionError::Timeout(self.timeout),
            InsightError::Query(msg) => ExecutionError::InvalidStatement(msg),
            other => ExecutionError::InvalidStatement(other.to_string()),
        }
    }
}

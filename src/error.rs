//! Error types for shopinsight.
//!
//! `InsightError` covers infrastructure failures (database, language model,
//! configuration). The pipeline taxonomy (`GenerationError`,
//! `ExecutionError`, `PipelineError`) describes how a single question failed
//! and which stage it failed in.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure of a store, model or configuration call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InsightError {
    /// Database connection errors (host unreachable, pool closed, I/O).
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, unknown columns, type mismatches).
    #[error("Query error: {0}")]
    Query(String),

    /// LLM API errors (missing key, auth, rate limits, unreachable host).
    #[error("LLM error: {0}")]
    Llm(String),

    /// An outbound call did not finish in time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Unreadable config file, bad URL, failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A state the code should never reach.
    #[error("Internal error: {0}")]
    Internal(String),
}

// Constructors, so call sites can pass `&str`, `String` or `format!` output.
impl InsightError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result alias for infrastructure calls.
pub type Result<T> = std::result::Result<T, InsightError>;

/// Pipeline stage in which a question failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    Generating,
    Executing,
    Formatting,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Generating => "generating",
            Self::Executing => "executing",
            Self::Formatting => "formatting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of the SQL generation stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The language model is unconfigured, unreachable or refused the request.
    #[error("The language model is unavailable: {0}")]
    Unavailable(String),

    /// The model answered, but nothing usable was left after cleanup.
    #[error("The language model returned no SQL for this question")]
    Empty,

    /// The model did not answer within the configured timeout.
    #[error("The language model did not respond within {}s", .0.as_secs())]
    Timeout(Duration),
}

impl GenerationError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Empty => "empty",
            Self::Timeout(_) => "timeout",
        }
    }
}

/// Failure of the SQL execution stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The statement is not a single read-only query and was never sent to the store.
    #[error("Statement rejected: {0}")]
    Forbidden(String),

    /// The statement could not be parsed or the engine rejected it.
    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    /// The data store could not be reached.
    #[error("Database connection lost: {0}")]
    ConnectionLost(String),

    /// The statement did not finish within the configured timeout.
    #[error("Statement did not finish within {}s", .0.as_secs())]
    Timeout(Duration),
}

impl ExecutionError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "forbidden",
            Self::InvalidStatement(_) => "invalid_statement",
            Self::ConnectionLost(_) => "connection_lost",
            Self::Timeout(_) => "timeout",
        }
    }
}

/// Terminal failure of one pipeline invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The question was rejected before any outbound call.
    #[error("{0}")]
    Validation(String),

    #[error("Could not generate SQL from your question: {0}")]
    Generation(#[from] GenerationError),

    /// Execution failed; `sql` is the statement that was attempted.
    #[error("Query execution failed: {error}")]
    Execution {
        #[source]
        error: ExecutionError,
        sql: String,
    },

    /// Anything unanticipated, including panics inside a stage.
    #[error("Internal error while {stage}: {message}")]
    Internal { stage: Stage, message: String },
}

impl PipelineError {
    /// Returns the stage the pipeline was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Validation(_) => Stage::Validation,
            Self::Generation(_) => Stage::Generating,
            Self::Execution { .. } => Stage::Executing,
            Self::Internal { stage, .. } => *stage,
        }
    }

    /// Returns a short machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Generation(e) => e.reason(),
            Self::Execution { error, .. } => error.reason(),
            Self::Internal { .. } => "internal",
        }
    }

    /// Returns the statement that was attempted, if execution was reached.
    pub fn attempted_sql(&self) -> Option<&str> {
        match self {
            Self::Execution { sql, .. } => Some(sql),
            _ => None,
        }
    }
}

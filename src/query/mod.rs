//! Execution of generated SQL.
//!
//! A [`SqlCandidate`] is model output that has not been checked yet. The
//! executor consumes it, so a candidate is executed at most once.

pub mod executor;

pub use executor::QueryExecutor;

use std::fmt;

/// Model-generated SQL pending the read-only policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlCandidate(String);

impl SqlCandidate {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SqlCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

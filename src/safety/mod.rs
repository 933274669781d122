//! Read-only statement policy.
//!
//! Every candidate statement comes from a language model and is untrusted.
//! Before anything reaches the store it is parsed with sqlparser and must be
//! exactly one read-only query. Statements that cannot be parsed are never
//! executed.

mod parser;

pub use parser::{classify_sql, parse_statements};

use crate::db::DatabaseBackend;
use crate::error::ExecutionError;
use std::fmt;

/// What a parsed candidate would do to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementType {
    Select,
    /// `SELECT ... INTO new_table`, which creates a table.
    SelectInto,
    /// `SELECT ... FOR UPDATE` and other row-locking clauses.
    LockingSelect,
    Insert,
    Update,
    Delete,
    Merge,
    Drop,
    Truncate,
    Alter,
    Create,
    Grant,
    Revoke,
    Explain,
    Show,
    /// More than one statement; holds how many.
    Multiple(usize),
    /// Parsed, but not a kind the policy recognises.
    Unknown,
}

impl StatementType {
    /// Returns true for statements the policy lets through.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Select)
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            Self::Select => "SELECT",
            Self::SelectInto => "SELECT INTO",
            Self::LockingSelect => "SELECT ... FOR UPDATE",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Merge => "MERGE",
            Self::Drop => "DROP",
            Self::Truncate => "TRUNCATE",
            Self::Alter => "ALTER",
            Self::Create => "CREATE",
            Self::Grant => "GRANT",
            Self::Revoke => "REVOKE",
            Self::Explain => "EXPLAIN",
            Self::Show => "SHOW",
            Self::Multiple(n) => return write!(f, "{n} statements"),
            Self::Unknown => "unrecognized",
        };
        f.write_str(keyword)
    }
}

/// Removes surrounding whitespace and at most one trailing `;`.
pub fn strip_terminator(sql: &str) -> &str {
    let trimmed = sql.trim();
    trimmed
        .strip_suffix(';')
        .map(str::trim_end)
        .unwrap_or(trimmed)
}

/// Gate that admits only a single read-only query.
#[derive(Debug, Clone, Copy)]
pub struct ReadOnlyPolicy {
    backend: DatabaseBackend,
}

impl ReadOnlyPolicy {
    /// Creates a policy that parses with the backend's SQL dialect.
    pub fn new(backend: DatabaseBackend) -> Self {
        Self { backend }
    }

    /// Checks a candidate and returns the statement to execute.
    ///
    /// The returned text is the accepted statement rendered back from its
    /// parse tree, never the raw candidate. Comments are dropped, so text the
    /// parser read as a comment cannot be run as SQL by an engine that lexes
    /// comments differently (SQLite does not nest `/* */`).
    ///
    /// Parse failures are `InvalidStatement`; anything parsed that is not a
    /// single plain query is `Forbidden`.
    pub fn check(&self, sql: &str) -> Result<String, ExecutionError> {
        let statement = strip_terminator(sql);
        if statement.is_empty() {
            return Err(ExecutionError::InvalidStatement(
                "the statement is empty".to_string(),
            ));
        }

        let statements = parse_statements(statement, self.backend)
            .map_err(|e| ExecutionError::InvalidStatement(format!("could not parse SQL: {e}")))?;

        let kind = match statements.as_slice() {
            [] => {
                return Err(ExecutionError::InvalidStatement(
                    "the statement contains no SQL".to_string(),
                ))
            }
            [single] => parser::classify_statement(single),
            many => StatementType::Multiple(many.len()),
        };

        match kind {
            StatementType::Select => Ok(statements[0].to_string()),
            StatementType::Multiple(n) => Err(ExecutionError::Forbidden(format!(
                "only a single statement is allowed, found {n}"
            ))),
            other => Err(ExecutionError::Forbidden(format!(
                "{other} statements are not allowed; only read-only SELECT queries run"
            ))),
        }
    }
}

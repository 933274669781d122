//! The structured result of one question.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::db::QueryResult;
use crate::error::PipelineError;

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success,
    Failure(PipelineError),
}

/// Answer to one question. Built once at the end of an invocation.
///
/// Serializes to the HTTP response body: on success
/// `{question, sql_query, data, response, success: true}`, on failure
/// `{error, success: false, stage, reason}` plus `sql_query` when a
/// statement had been generated.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub question: String,
    pub sql: Option<String>,
    pub rows: QueryResult,
    pub summary: Option<String>,
    pub outcome: Outcome,
}

impl Answer {
    pub fn success(
        question: impl Into<String>,
        sql: impl Into<String>,
        rows: QueryResult,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            sql: Some(sql.into()),
            rows,
            summary: Some(summary.into()),
            outcome: Outcome::Success,
        }
    }

    pub fn failure(question: impl Into<String>, error: PipelineError) -> Self {
        Self {
            question: question.into(),
            sql: error.attempted_sql().map(str::to_string),
            rows: QueryResult::new(),
            summary: None,
            outcome: Outcome::Failure(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success)
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match &self.outcome {
            Outcome::Success => None,
            Outcome::Failure(e) => Some(e),
        }
    }
}

impl Serialize for Answer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.outcome {
            Outcome::Success => {
                let mut map = serializer.serialize_map(Some(5))?;
                map.serialize_entry("question", &self.question)?;
                map.serialize_entry("sql_query", &self.sql)?;
                map.serialize_entry("data", &self.rows)?;
                map.serialize_entry("response", &self.summary)?;
                map.serialize_entry("success", &true)?;
                map.end()
            }
            Outcome::Failure(error) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("error", &error.to_string())?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("stage", &error.stage())?;
                map.serialize_entry("reason", error.reason())?;
                if let Some(sql) = &self.sql {
                    map.serialize_entry("sql_query", sql)?;
                }
                map.end()
            }
        }
    }
}

//! Result set to prose summary.
//!
//! Formatting never fails: when the model cannot produce a summary, a fixed
//! sentence built from the row count is used instead.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::db::QueryResult;
use crate::llm::{build_summary_prompt, CompletionOptions, LlmClient};

/// Summary used when the model produced none.
pub fn fallback_summary(row_count: usize) -> String {
    if row_count == 0 {
        "No matching data was found for this question (0 rows). Raw results are attached."
            .to_string()
    } else {
        format!("Query returned {row_count} rows. Raw results are attached.")
    }
}

#[derive(Clone)]
pub struct ResponseFormatter {
    llm: Arc<dyn LlmClient>,
    options: CompletionOptions,
    timeout: Duration,
}

impl ResponseFormatter {
    pub fn new(llm: Arc<dyn LlmClient>, options: CompletionOptions, timeout: Duration) -> Self {
        Self {
            llm,
            options,
            timeout,
        }
    }

    /// Summarizes `result` as an answer to `question`.
    pub async fn format(&self, question: &str, sql: &str, result: &QueryResult) -> String {
        let messages = build_summary_prompt(question, sql, result).to_messages();

        match tokio::time::timeout(self.timeout, self.llm.complete(&messages, &self.options)).await
        {
            Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(Ok(_)) => {
                warn!("Model returned an empty summary, using fallback");
                fallback_summary(result.row_count)
            }
            Ok(Err(e)) => {
                warn!("Summary generation failed, using fallback: {e}");
                fallback_summary(result.row_count)
            }
            Err(_) => {
                warn!("Summary generation exceeded {:?}, using fallback", self.timeout);
                fallback_summary(result.row_count)
            }
        }
    }
}

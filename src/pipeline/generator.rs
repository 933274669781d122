//! Question to SQL candidate.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{GenerationError, InsightError};
use crate::llm::{strip_code_fence, CompletionOptions, LlmClient, PromptPair};
use crate::query::SqlCandidate;

/// Asks the model for one SQL statement. Never retries.
#[derive(Clone)]
pub struct QueryGenerator {
    llm: Arc<dyn LlmClient>,
    options: CompletionOptions,
    timeout: Duration,
}

impl QueryGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, options: CompletionOptions, timeout: Duration) -> Self {
        Self {
            llm,
            options,
            timeout,
        }
    }

    /// Sends the prompt and cleans the reply into a candidate statement.
    ///
    /// Dropping the timed-out future cancels the in-flight request.
    pub async fn generate(&self, prompt: &PromptPair) -> Result<SqlCandidate, GenerationError> {
        let messages = prompt.to_messages();

        let response =
            match tokio::time::timeout(self.timeout, self.llm.complete(&messages, &self.options))
                .await
            {
                Err(_) => {
                    warn!("Model call exceeded {:?}", self.timeout);
                    return Err(GenerationError::Timeout(self.timeout));
                }
                Ok(Err(InsightError::Timeout(msg))) => {
                    warn!("Model call timed out: {msg}");
                    return Err(GenerationError::Timeout(self.timeout));
                }
                Ok(Err(InsightError::Llm(msg))) => {
                    warn!("Model unavailable: {msg}");
                    return Err(GenerationError::Unavailable(msg));
                }
                Ok(Err(other)) => {
                    warn!("Model unavailable: {other}");
                    return Err(GenerationError::Unavailable(other.to_string()));
                }
                Ok(Ok(text)) => text,
            };

        let sql = strip_code_fence(&response);
        if sql.is_empty() {
            return Err(GenerationError::Empty);
        }

        debug!(sql, "Generated SQL");
        Ok(SqlCandidate::new(sql))
    }
}

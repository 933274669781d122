//! Offline model for tests and `--llm mock`.
//!
//! Provides deterministic responses based on input patterns. Requests whose
//! system instruction is the summarization prompt are answered with a short
//! summary that echoes the results line, so tests can check which numbers
//! reached the formatter.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{InsightError, Result};
use crate::llm::prompt::SUMMARY_SYSTEM_PROMPT;
use crate::llm::types::{CompletionOptions, Message, Role};
use crate::llm::LlmClient;

/// Answers known e-commerce questions with fixed SQL, fenced or bare.
///
/// Clones share the call counter.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Checked before the built-in questions, in insertion order.
    custom_responses: Vec<(String, String)>,
    /// Every call fails with this error.
    failure: Option<InsightError>,
    /// Summarization calls fail; generation still works.
    fail_summaries: bool,
    summary_response: Option<String>,
    latency: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `response` for any question containing `pattern`
    /// (case-insensitive).
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// A client whose every call fails like an unreachable provider.
    pub fn unavailable() -> Self {
        Self {
            failure: Some(InsightError::llm("Failed to connect to mock provider")),
            ..Self::default()
        }
    }

    /// Makes summarization calls fail.
    pub fn with_failing_summaries(mut self) -> Self {
        self.fail_summaries = true;
        self
    }

    /// Fixes the text returned for summarization calls.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary_response = Some(summary.into());
        self
    }

    /// Delays every response.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of `complete` calls made through this client or its clones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// SQL for the question in a generation prompt.
    fn mock_sql(&self, input: &str) -> String {
        let question = input
            .strip_prefix("Convert this question to SQL:")
            .unwrap_or(input)
            .trim();
        let q = question.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if q.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if q.contains("delete") || q.contains("remove") {
            return "DELETE FROM total_sales_metrics".to_string();
        }

        if q.contains("drop") {
            return "DROP TABLE ad_sales_metrics".to_string();
        }

        if q.contains("roas") || q.contains("return on ad spend") {
            return "```sql\nSELECT SUM(ad_sales) / SUM(ad_spend) AS roas FROM ad_sales_metrics WHERE ad_spend > 0\n```"
                .to_string();
        }

        if q.contains("cpc") || q.contains("cost per click") {
            return "```sql\nSELECT item_id, MAX(ad_spend / NULLIF(clicks, 0)) AS highest_cpc\nFROM ad_sales_metrics\nWHERE clicks > 0\nGROUP BY item_id\nORDER BY highest_cpc DESC\nLIMIT 1\n```"
                .to_string();
        }

        if q.contains("not eligible") || q.contains("ineligible") {
            return "SELECT item_id, reason FROM product_eligibility WHERE eligibility_status = 'ineligible'"
                .to_string();
        }

        if q.contains("total sales") {
            return "```sql\nSELECT SUM(total_sales) AS total_sales FROM total_sales_metrics;\n```"
                .to_string();
        }

        if q.contains("ad spend") {
            return "SELECT item_id, SUM(ad_spend) AS total_spend FROM ad_sales_metrics GROUP BY item_id ORDER BY total_spend DESC LIMIT 10"
                .to_string();
        }

        "Sorry, I can only answer questions about sales, advertising and eligibility.".to_string()
    }

    /// Generates a mock summary that quotes the results line.
    fn mock_summary(&self, input: &str) -> String {
        if let Some(summary) = &self.summary_response {
            return summary.clone();
        }

        let results = input
            .lines()
            .find_map(|line| line.strip_prefix("Query Results: "))
            .unwrap_or("[]");
        format!("Based on the query results: {results}")
    }

    fn is_summary_request(messages: &[Message]) -> bool {
        messages
            .iter()
            .any(|m| m.role == Role::System && m.content == SUMMARY_SYSTEM_PROMPT)
    }

    fn last_user_turn(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message], _options: &CompletionOptions) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let input = Self::last_user_turn(messages);
        if Self::is_summary_request(messages) {
            if self.fail_summaries {
                return Err(InsightError::llm("Mock summary failure"));
            }
            return Ok(self.mock_summary(&input));
        }

        Ok(self.mock_sql(&input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::parser::strip_code_fence;

    async fn ask(client: &MockLlmClient, question: &str) -> String {
        let messages = vec![
            Message::system("generation rules"),
            Message::user(format!("Convert this question to SQL: {question}")),
        ];
        client
            .complete(&messages, &CompletionOptions::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_mock_total_sales() {
        let client = MockLlmClient::new();
        let response = ask(&client, "What is my total sales?").await;

        assert!(response.contains("SELECT SUM(total_sales) AS total_sales"));
        assert!(response.starts_with("```sql"));
    }

    #[tokio::test]
    async fn test_mock_metrics_questions() {
        let client = MockLlmClient::new();

        let roas = ask(&client, "Calculate the RoAS").await;
        assert!(strip_code_fence(&roas).starts_with("SELECT SUM(ad_sales) / SUM(ad_spend)"));

        let cpc = ask(&client, "Which product had the highest CPC?").await;
        assert!(cpc.contains("NULLIF(clicks, 0)"));
    }

    #[tokio::test]
    async fn test_mock_delete_request() {
        let client = MockLlmClient::new();
        let response = ask(&client, "Delete all my sales data").await;
        assert_eq!(response, "DELETE FROM total_sales_metrics");
    }

    #[tokio::test]
    async fn test_mock_unknown_question() {
        let client = MockLlmClient::new();
        let response = ask(&client, "What is the meaning of life?").await;
        assert!(response.starts_with("Sorry"));
    }

    #[tokio::test]
    async fn test_mock_custom_response_is_case_insensitive() {
        let client = MockLlmClient::new().with_response(
            "Item P999",
            "SELECT total_sales FROM total_sales_metrics WHERE item_id = 'P999'",
        );
        let response = ask(&client, "total sales for item p999").await;
        assert!(response.contains("'P999'"));
    }

    #[tokio::test]
    async fn test_mock_summary_echoes_results() {
        let client = MockLlmClient::new();
        let messages = vec![
            Message::system(SUMMARY_SYSTEM_PROMPT),
            Message::user("Question: q\nSQL Query: SELECT 1\nQuery Results: [{\"total_sales\":12000.0}]\nTotal rows: 1"),
        ];
        let summary = client
            .complete(&messages, &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(
            summary,
            "Based on the query results: [{\"total_sales\":12000.0}]"
        );
    }

    #[tokio::test]
    async fn test_mock_failures_and_call_count() {
        let client = MockLlmClient::unavailable();
        let shared = client.clone();
        assert!(client
            .complete(&[Message::user("hi")], &CompletionOptions::default())
            .await
            .is_err());
        assert_eq!(shared.call_count(), 1);

        let client = MockLlmClient::new().with_failing_summaries();
        assert!(client
            .complete(
                &[Message::system(SUMMARY_SYSTEM_PROMPT), Message::user("x")],
                &CompletionOptions::default()
            )
            .await
            .is_err());
        assert!(ask(&client, "total sales").await.contains("SUM"));
    }
}

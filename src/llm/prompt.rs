//! Prompt construction for LLM requests.
//!
//! The generation prompt embeds the rendered schema catalog. The catalog is
//! immutable, so its text is rendered once when the builder is created and
//! shared by every request.

use std::sync::Arc;

use crate::catalog::SchemaCatalog;
use crate::db::{DatabaseBackend, QueryResult};
use crate::llm::types::Message;

/// Rows of the result set included in the summary prompt.
pub const SUMMARY_ROW_LIMIT: usize = 50;

const GENERATION_PROMPT_TEMPLATE: &str = r#"You are an expert SQL query generator for an e-commerce database running on {dialect}. Given a natural language question, generate a precise SQL query.

Database Schema:
{schema}

Important Guidelines:
1. Only generate read-only SELECT queries for data retrieval
2. Use proper JOIN statements when querying multiple tables, using item_id as the join key
3. Use aggregate functions (SUM, AVG, COUNT, MAX, MIN) for totals and rollups
4. For RoAS (Return on Ad Spend): SUM(ad_sales) / SUM(ad_spend)
5. For CPC (Cost Per Click): ad_spend / NULLIF(clicks, 0)
6. Use WHERE clauses when filtering is needed
7. Give every calculated expression a column alias
8. Do not end the query with a semicolon
9. Return only the SQL query, without explanation or markdown formatting

Example queries:
- Total sales: SELECT SUM(total_sales) AS total_sales FROM total_sales_metrics
- RoAS: SELECT SUM(ad_sales) / SUM(ad_spend) AS roas FROM ad_sales_metrics WHERE ad_spend > 0
- Highest CPC: SELECT item_id, MAX(ad_spend / NULLIF(clicks, 0)) AS highest_cpc FROM ad_sales_metrics WHERE clicks > 0 GROUP BY item_id ORDER BY highest_cpc DESC LIMIT 1
- Most ad spend: SELECT item_id, SUM(ad_spend) AS total_spend FROM ad_sales_metrics GROUP BY item_id ORDER BY total_spend DESC LIMIT 10"#;

/// System instruction for result summarization.
pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You are an expert data analyst. Given a question, the SQL query that was run and its results, provide a clear, human-readable answer.

Guidelines:
1. Answer the question directly
2. Include the relevant numbers
3. Format currency values appropriately
4. Explain any derived metric that was calculated
5. Keep the answer concise
6. If the result has many rows, summarize them"#;

/// System instruction and user message for one model call.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPair {
    pub system_instruction: String,
    pub user_message: String,
}

impl PromptPair {
    pub fn to_messages(&self) -> Vec<Message> {
        vec![
            Message::system(self.system_instruction.clone()),
            Message::user(self.user_message.clone()),
        ]
    }
}

/// Builds generation prompts against a fixed catalog.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_instruction: Arc<str>,
}

impl PromptBuilder {
    pub fn new(catalog: &SchemaCatalog, backend: DatabaseBackend) -> Self {
        let system_instruction = GENERATION_PROMPT_TEMPLATE
            .replace("{dialect}", backend.dialect_name())
            .replace("{schema}", &catalog.render());
        Self {
            system_instruction: Arc::from(system_instruction),
        }
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Builds the prompt pair for one question.
    pub fn build(&self, question: &str) -> PromptPair {
        PromptPair {
            system_instruction: self.system_instruction.to_string(),
            user_message: format!("Convert this question to SQL: {question}"),
        }
    }
}

/// Builds a generation prompt without keeping the builder around.
pub fn build(question: &str, catalog: &SchemaCatalog, backend: DatabaseBackend) -> PromptPair {
    PromptBuilder::new(catalog, backend).build(question)
}

/// Builds the summarization prompt for an executed query.
///
/// At most [`SUMMARY_ROW_LIMIT`] records are embedded; the total row count is
/// always stated.
pub fn build_summary_prompt(question: &str, sql: &str, result: &QueryResult) -> PromptPair {
    let records = result.records_limited(SUMMARY_ROW_LIMIT);
    let json = serde_json::to_string(&records).unwrap_or_else(|_| "[]".to_string());

    let note = if result.row_count > records.len() {
        format!(
            "Total rows: {} (only the first {} are shown)",
            result.row_count,
            records.len()
        )
    } else {
        format!("Total rows: {}", result.row_count)
    };

    PromptPair {
        system_instruction: SUMMARY_SYSTEM_PROMPT.to_string(),
        user_message: format!(
            "Question: {question}\nSQL Query: {sql}\nQuery Results: {json}\n{note}\n\n\
             Please provide a human-readable answer to the question based on the query results."
        ),
    }
}

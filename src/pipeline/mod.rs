//! Question-to-answer orchestration.
//!
//! `Received -> Generating -> Executing -> Formatting -> Done`. The first
//! failing stage ends the invocation; formatting cannot fail. Each stage runs
//! under `catch_unwind`, so a panic becomes an internal error for that stage
//! instead of tearing down the request task.

pub mod answer;
pub mod formatter;
pub mod generator;

pub use answer::{Answer, Outcome};
pub use formatter::{fallback_summary, ResponseFormatter};
pub use generator::QueryGenerator;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::{error, info, info_span, Instrument};

use crate::catalog::SchemaCatalog;
use crate::config::Config;
use crate::db::DatabaseClient;
use crate::error::{PipelineError, Stage};
use crate::llm::{CompletionOptions, LlmClient, PromptBuilder};
use crate::query::QueryExecutor;

/// Timeouts and sampling parameters for one pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub generation: CompletionOptions,
    pub summary: CompletionOptions,
    pub llm_timeout: Duration,
    pub statement_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            generation: CompletionOptions::new(0.1, 500),
            summary: CompletionOptions::new(0.3, 300),
            llm_timeout: Duration::from_secs(30),
            statement_timeout: Duration::from_secs(30),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            generation: config.llm.generation.options(),
            summary: config.llm.summary.options(),
            llm_timeout: config.llm.timeout(),
            statement_timeout: config.database.statement_timeout(),
        }
    }
}

/// Answers questions with injected store and model clients.
///
/// Cheap to clone; all clones share the same clients.
#[derive(Clone)]
pub struct Pipeline {
    prompts: PromptBuilder,
    generator: QueryGenerator,
    executor: QueryExecutor,
    formatter: ResponseFormatter,
}

impl Pipeline {
    pub fn new(
        catalog: &SchemaCatalog,
        db: Arc<dyn DatabaseClient>,
        llm: Arc<dyn LlmClient>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            prompts: PromptBuilder::new(catalog, db.backend()),
            generator: QueryGenerator::new(
                Arc::clone(&llm),
                settings.generation,
                settings.llm_timeout,
            ),
            executor: QueryExecutor::new(db, settings.statement_timeout),
            formatter: ResponseFormatter::new(llm, settings.summary, settings.llm_timeout),
        }
    }

    /// Answers one question. Total: every input yields an [`Answer`].
    pub async fn ask(&self, question: &str) -> Answer {
        let span = info_span!("ask", question = %question.trim());
        self.run(question).instrument(span).await
    }

    async fn run(&self, question: &str) -> Answer {
        let start = Instant::now();
        let question = question.trim();

        if question.is_empty() {
            info!(stage = %Stage::Validation, "Rejected empty question");
            return Answer::failure(
                question,
                PipelineError::Validation("Question is required".to_string()),
            );
        }

        info!(stage = %Stage::Generating, "Generating SQL");
        let prompt = self.prompts.build(question);
        let candidate = match guard(Stage::Generating, async {
            self.generator.generate(&prompt).await.map_err(PipelineError::from)
        })
        .await
        {
            Ok(candidate) => candidate,
            Err(e) => return fail(question, e),
        };

        info!(stage = %Stage::Executing, "Executing SQL");
        let sql = candidate.as_str().to_string();
        let rows = match guard(Stage::Executing, async {
            self.executor
                .execute(candidate)
                .await
                .map_err(|error| PipelineError::Execution {
                    error,
                    sql: sql.clone(),
                })
        })
        .await
        {
            Ok(rows) => rows,
            Err(e) => return fail(question, e),
        };

        info!(stage = %Stage::Formatting, rows = rows.row_count, "Formatting answer");
        let summary = match guard(Stage::Formatting, async {
            Ok(self.formatter.format(question, &sql, &rows).await)
        })
        .await
        {
            Ok(summary) => summary,
            Err(e) => {
                error!("{e}; using fallback summary");
                fallback_summary(rows.row_count)
            }
        };

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            rows = rows.row_count,
            "Answered question"
        );
        Answer::success(question, sql, rows, summary)
    }
}

fn fail(question: &str, error: PipelineError) -> Answer {
    info!(
        stage = %error.stage(),
        reason = error.reason(),
        "Question failed: {error}"
    );
    Answer::failure(question, error)
}

/// Runs one stage, turning a panic into `PipelineError::Internal`.
async fn guard<T, F>(stage: Stage, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(stage = %stage, "Stage panicked: {message}");
            Err(PipelineError::Internal { stage, message })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnInfo, MockDatabaseClient, QueryResult, Value};
    use crate::error::{ExecutionError, GenerationError};
    use crate::llm::{MockLlmClient, UnavailableLlmClient};

    fn pipeline(db: MockDatabaseClient, llm: impl LlmClient + 'static) -> Pipeline {
        Pipeline::new(
            &SchemaCatalog::ecommerce(),
            Arc::new(db),
            Arc::new(llm),
            PipelineSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_whitespace_question_makes_no_calls() {
        let db = MockDatabaseClient::new();
        let llm = MockLlmClient::new();
        let pipeline = pipeline(db.clone(), llm.clone());

        let answer = pipeline.ask("  \n\t ").await;

        let err = answer.error().unwrap();
        assert_eq!(err.stage(), Stage::Validation);
        assert_eq!(llm.call_count(), 0);
        assert_eq!(db.execution_count(), 0);
    }

    #[tokio::test]
    async fn test_success_path() {
        let db = MockDatabaseClient::with_result(QueryResult::with_data(
            vec![ColumnInfo::new("total_sales", "REAL")],
            vec![vec![Value::Float(12000.0)]],
        ));
        let llm = MockLlmClient::new();
        let pipeline = pipeline(db.clone(), llm.clone());

        let answer = pipeline.ask("What is my total sales?").await;

        assert!(answer.is_success(), "{:?}", answer.error());
        assert_eq!(
            answer.sql.as_deref(),
            Some("SELECT SUM(total_sales) AS total_sales FROM total_sales_metrics;")
        );
        assert_eq!(answer.rows.row_count, 1);
        assert!(answer.summary.unwrap().contains("12000"));
        assert_eq!(llm.call_count(), 2);
        assert_eq!(db.execution_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_model_never_touches_store() {
        let db = MockDatabaseClient::new();
        let pipeline = pipeline(db.clone(), UnavailableLlmClient::new("No API key configured"));

        let answer = pipeline.ask("What is my total sales?").await;

        let err = answer.error().unwrap();
        assert_eq!(err.stage(), Stage::Generating);
        assert!(matches!(
            err,
            PipelineError::Generation(GenerationError::Unavailable(_))
        ));
        assert_eq!(db.execution_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_request_is_forbidden() {
        let db = MockDatabaseClient::new();
        let llm = MockLlmClient::new();
        let pipeline = pipeline(db.clone(), llm.clone());

        let answer = pipeline.ask("Please delete all sales rows").await;

        match answer.error() {
            Some(PipelineError::Execution {
                error: ExecutionError::Forbidden(_),
                sql,
            }) => assert_eq!(sql, "DELETE FROM total_sales_metrics"),
            other => panic!("expected forbidden execution, got {other:?}"),
        }
        assert_eq!(db.execution_count(), 0);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_summary_failure_still_succeeds() {
        let db = MockDatabaseClient::new();
        let pipeline = pipeline(db, MockLlmClient::new().with_failing_summaries());

        let answer = pipeline.ask("What is my total sales?").await;

        assert!(answer.is_success());
        assert_eq!(answer.summary.as_deref(), Some(fallback_summary(0).as_str()));
    }

    async fn explode() -> Result<(), PipelineError> {
        panic!("executor exploded")
    }

    #[tokio::test]
    async fn test_guard_converts_panics() {
        let result = guard(Stage::Executing, explode()).await;

        assert_eq!(
            result.unwrap_err(),
            PipelineError::Internal {
                stage: Stage::Executing,
                message: "executor exploded".into()
            }
        );
    }
}

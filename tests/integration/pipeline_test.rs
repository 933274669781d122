//! End-to-end pipeline tests over the sample data.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use shopinsight::db::{FailingDatabaseClient, Value};
use shopinsight::error::{ExecutionError, GenerationError, PipelineError, Stage};
use shopinsight::llm::{MockLlmClient, UnavailableLlmClient};
use shopinsight::pipeline::fallback_summary;

use super::{count_rows, pipeline_over, seeded_sqlite};

#[tokio::test]
async fn test_total_sales_question() {
    let db = seeded_sqlite().await;
    let pipeline = pipeline_over(db.clone(), MockLlmClient::new());

    let answer = pipeline.ask("What is my total sales?").await;

    assert!(answer.is_success(), "{:?}", answer.error());
    let sql = answer.sql.as_deref().unwrap();
    assert!(sql.contains("SUM(total_sales)"));
    assert_eq!(answer.rows.row_count, 1);
    assert_eq!(answer.rows.rows[0][0].as_f64(), Some(12000.0));
    assert!(answer.summary.as_deref().unwrap().contains("12000"));

    let body = serde_json::to_value(&answer).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0]["total_sales"].as_f64(), Some(12000.0));
}

#[tokio::test]
async fn test_delete_request_leaves_store_unchanged() {
    let db = seeded_sqlite().await;
    let before = count_rows(db.as_ref(), "total_sales_metrics").await;
    let llm = MockLlmClient::new();
    let pipeline = pipeline_over(db.clone(), llm.clone());

    let answer = pipeline.ask("Delete all my sales data").await;

    let err = answer.error().unwrap();
    assert_eq!(err.stage(), Stage::Executing);
    assert!(matches!(
        err,
        PipelineError::Execution {
            error: ExecutionError::Forbidden(_),
            ..
        }
    ));
    assert_eq!(answer.sql.as_deref(), Some("DELETE FROM total_sales_metrics"));
    assert_eq!(llm.call_count(), 1);
    assert_eq!(count_rows(db.as_ref(), "total_sales_metrics").await, before);
}

#[tokio::test]
async fn test_disguised_writes_are_forbidden() {
    let db = seeded_sqlite().await;
    let llm = MockLlmClient::new()
        .with_response("stacked", "SELECT 1; DELETE FROM total_sales_metrics")
        .with_response("commented", "/* SELECT */ DROP TABLE product_eligibility");
    let pipeline = pipeline_over(db.clone(), llm);

    for question in ["stacked query please", "commented query please"] {
        let answer = pipeline.ask(question).await;
        assert_eq!(
            answer.error().map(|e| e.reason()),
            Some("forbidden"),
            "{question}"
        );
    }

    assert_eq!(count_rows(db.as_ref(), "total_sales_metrics").await, 13);
    assert_eq!(count_rows(db.as_ref(), "product_eligibility").await, 8);
}

#[tokio::test]
async fn test_no_matching_rows_is_success() {
    let db = seeded_sqlite().await;
    let llm = MockLlmClient::new()
        .with_response(
            "P999",
            "SELECT date, total_sales FROM total_sales_metrics WHERE item_id = 'P999'",
        )
        .with_failing_summaries();
    let pipeline = pipeline_over(db, llm);

    let answer = pipeline.ask("Show sales for item P999").await;

    assert!(answer.is_success());
    assert_eq!(answer.rows.row_count, 0);
    assert_eq!(answer.summary.as_deref(), Some(fallback_summary(0).as_str()));
    assert!(answer.summary.as_ref().unwrap().contains("No matching data"));

    let body = serde_json::to_value(&answer).unwrap();
    assert_eq!(body["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_unavailable_model_makes_no_store_call() {
    // Any store call would fail with a connection error.
    let db = Arc::new(FailingDatabaseClient::unreachable());
    let pipeline = pipeline_over(db, UnavailableLlmClient::new("No API key configured"));

    let answer = pipeline.ask("What is my total sales?").await;

    let err = answer.error().unwrap();
    assert_eq!(err.stage(), Stage::Generating);
    assert!(matches!(
        err,
        PipelineError::Generation(GenerationError::Unavailable(_))
    ));
    assert_eq!(answer.sql, None);
}

#[tokio::test]
async fn test_roas_question() {
    let db = seeded_sqlite().await;
    let pipeline = pipeline_over(db, MockLlmClient::new());

    let answer = pipeline.ask("Calculate the RoAS").await;

    assert!(answer.is_success(), "{:?}", answer.error());
    assert!(!answer.sql.as_deref().unwrap().contains("```"));
    let roas = answer.rows.rows[0][0].as_f64().unwrap();
    assert!((roas - 6830.0 / 3000.0).abs() < 1e-9, "{roas}");
}

#[tokio::test]
async fn test_highest_cpc_question() {
    let db = seeded_sqlite().await;
    let pipeline = pipeline_over(db, MockLlmClient::new());

    let answer = pipeline
        .ask("Which product had the highest CPC (Cost Per Click)?")
        .await;

    assert!(answer.is_success(), "{:?}", answer.error());
    assert_eq!(answer.rows.rows[0][0], Value::String("P004".into()));
    assert_eq!(answer.rows.rows[0][1].as_f64(), Some(4.0));
}

#[tokio::test]
async fn test_ineligible_products_question() {
    let db = seeded_sqlite().await;
    let pipeline = pipeline_over(db, MockLlmClient::new());

    let answer = pipeline.ask("Which products are ineligible for ads?").await;

    assert!(answer.is_success(), "{:?}", answer.error());
    assert_eq!(answer.rows.row_count, 1);
    assert_eq!(answer.rows.rows[0][0], Value::String("P005".into()));
}

#[tokio::test]
async fn test_unknown_table_is_invalid_statement() {
    let db = seeded_sqlite().await;
    let llm = MockLlmClient::new().with_response("refunds", "SELECT * FROM refunds");
    let pipeline = pipeline_over(db, llm);

    let answer = pipeline.ask("How many refunds were there?").await;

    let err = answer.error().unwrap();
    assert_eq!(err.reason(), "invalid_statement");
    assert_eq!(answer.sql.as_deref(), Some("SELECT * FROM refunds"));
}

#[tokio::test]
async fn test_concurrent_questions_share_clients() {
    let db = seeded_sqlite().await;
    let llm = MockLlmClient::new();
    let pipeline = pipeline_over(db, llm.clone());

    let questions = [
        "What is my total sales?",
        "Calculate the RoAS",
        "Which products are ineligible for ads?",
        "What is my total ad spend?",
    ];
    let answers = futures::future::join_all(questions.iter().map(|q| pipeline.ask(q))).await;

    for answer in &answers {
        assert!(answer.is_success(), "{}: {:?}", answer.question, answer.error());
    }
    assert_eq!(llm.call_count(), questions.len() * 2);
}

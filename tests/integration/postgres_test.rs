//! PostgreSQL tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL to a postgres:// URL to run them; the sample tables are
//! created and seeded if they are empty.

use std::sync::Arc;

use shopinsight::config::DatabaseConfig;
use shopinsight::db::seed::{self, SeedTarget};
use shopinsight::db::{DatabaseClient, PostgresClient, Value};
use shopinsight::error::ExecutionError;
use shopinsight::llm::MockLlmClient;
use shopinsight::query::{QueryExecutor, SqlCandidate};

use super::{count_rows, pipeline_over};

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| url.starts_with("postgres"))
}

/// Helper to create a seeded test client.
async fn get_test_client() -> Option<Arc<PostgresClient>> {
    let url = get_test_database_url()?;
    let client = PostgresClient::connect(&DatabaseConfig::from_url(url))
        .await
        .ok()?;
    seed::prepare(SeedTarget::Postgres(client.pool())).await.ok()?;
    Some(Arc::new(client))
}

#[tokio::test]
async fn test_ping_and_simple_select() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    client.ping().await.unwrap();
    let result = client
        .execute_query("SELECT 1 AS num, 'hello' AS greeting")
        .await
        .unwrap();

    assert_eq!(result.record_keys(), vec!["num", "greeting"]);
    assert_eq!(result.row_count, 1);
}

#[tokio::test]
async fn test_read_only_transaction_blocks_writes() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let before = count_rows(client.as_ref(), "total_sales_metrics").await;

    // Straight to the client, bypassing the statement policy.
    let result = client
        .execute_query("DELETE FROM total_sales_metrics")
        .await;

    assert!(result.is_err());
    assert_eq!(count_rows(client.as_ref(), "total_sales_metrics").await, before);
}

#[tokio::test]
async fn test_statement_timeout() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let url = get_test_database_url().unwrap();
    let config = DatabaseConfig {
        statement_timeout_secs: 1,
        ..DatabaseConfig::from_url(url)
    };
    let slow = PostgresClient::from_pool(client.pool().clone(), config.statement_timeout());
    let executor = QueryExecutor::new(Arc::new(slow), std::time::Duration::from_secs(10));

    let err = executor
        .execute(SqlCandidate::new("SELECT pg_sleep(3)"))
        .await
        .unwrap_err();

    assert!(matches!(err, ExecutionError::Timeout(_)), "{err:?}");
}

#[tokio::test]
async fn test_pipeline_over_postgres() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let pipeline = pipeline_over(client.clone(), MockLlmClient::new());

    let answer = pipeline.ask("Calculate the RoAS").await;

    assert!(answer.is_success(), "{:?}", answer.error());
    assert!(answer.rows.rows[0][0].as_f64().is_some());

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_numeric_results_decode_as_floats() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query("SELECT CAST(12000.50 AS NUMERIC(10, 2)) AS total, CAST(NULL AS NUMERIC) AS missing")
        .await
        .unwrap();

    assert_eq!(result.rows[0][0], Value::Float(12000.5));
    assert_eq!(result.rows[0][1], Value::Null);
}

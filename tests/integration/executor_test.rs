//! Query executor tests against a real SQLite store.

use std::sync::Arc;
use std::time::Duration;

use shopinsight::db::{DatabaseClient, Value};
use shopinsight::error::ExecutionError;
use shopinsight::query::{QueryExecutor, SqlCandidate};
use shopinsight::stats;

use super::{count_rows, seeded_sqlite};

async fn executor() -> (QueryExecutor, Arc<dyn DatabaseClient>) {
    let db: Arc<dyn DatabaseClient> = seeded_sqlite().await;
    (
        QueryExecutor::new(Arc::clone(&db), Duration::from_secs(5)),
        db,
    )
}

#[tokio::test]
async fn test_select_returns_named_columns() {
    let (executor, _) = executor().await;

    let result = executor
        .execute(SqlCandidate::new(
            "SELECT item_id, eligibility_status FROM product_eligibility ORDER BY item_id LIMIT 2;",
        ))
        .await
        .unwrap();

    assert_eq!(
        result.record_keys(),
        vec!["item_id".to_string(), "eligibility_status".to_string()]
    );
    assert_eq!(result.row_count, 2);
    assert_eq!(result.rows[0][0], Value::String("P001".into()));
}

#[tokio::test]
async fn test_duplicate_column_names_stay_distinct() {
    let (executor, _) = executor().await;

    let result = executor
        .execute(SqlCandidate::new(
            "SELECT a.item_id, t.item_id FROM ad_sales_metrics a \
             JOIN total_sales_metrics t ON a.item_id = t.item_id LIMIT 1",
        ))
        .await
        .unwrap();

    let keys = result.record_keys();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);
}

#[tokio::test]
async fn test_writes_are_rejected_before_execution() {
    let (executor, db) = executor().await;

    for sql in [
        "INSERT INTO product_eligibility (item_id, eligibility_status) VALUES ('X', 'eligible')",
        "UPDATE ad_sales_metrics SET clicks = 0",
        "DELETE FROM total_sales_metrics WHERE 1 = 1",
        "DROP TABLE ad_sales_metrics",
        "SELECT 1; DELETE FROM total_sales_metrics",
    ] {
        let err = executor.execute(SqlCandidate::new(sql)).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Forbidden(_)), "{sql}: {err:?}");
    }

    assert_eq!(count_rows(db.as_ref(), "ad_sales_metrics").await, 7);
    assert_eq!(count_rows(db.as_ref(), "total_sales_metrics").await, 13);
}

#[tokio::test]
async fn test_unparseable_sql_is_invalid() {
    let (executor, _) = executor().await;

    let err = executor
        .execute(SqlCandidate::new("Sorry, I can only answer questions about sales."))
        .await
        .unwrap_err();

    assert!(matches!(err, ExecutionError::InvalidStatement(_)), "{err:?}");
}

#[tokio::test]
async fn test_stats_over_sample_data() {
    let (_, db) = executor().await;

    let stats = stats::collect(db.as_ref()).await.unwrap();

    assert_eq!(stats.total_items, 8);
    assert_eq!(stats.eligible_items, 7);
    assert_eq!(stats.total_sales, 12000.0);
    assert_eq!(stats.total_ad_spend, 3000.0);
}

#[tokio::test]
async fn test_same_candidate_twice_gives_same_rows() {
    let (executor, _) = executor().await;
    let sql = "SELECT item_id, SUM(ad_sales) AS ad_sales FROM ad_sales_metrics \
               GROUP BY item_id ORDER BY item_id";

    let first = executor.execute(SqlCandidate::new(sql)).await.unwrap();
    let second = executor.execute(SqlCandidate::new(sql)).await.unwrap();

    assert!(!first.is_empty());
    assert_eq!(first.columns, second.columns);
    assert_eq!(first.rows, second.rows);
    assert_eq!(first.row_count, second.row_count);
}

async fn like_is_case_insensitive(executor: &QueryExecutor) -> bool {
    let result = executor
        .execute(SqlCandidate::new("SELECT 'a' LIKE 'A' AS matched"))
        .await
        .unwrap();
    result.rows[0][0] == Value::Int(1)
}

#[tokio::test]
async fn test_nested_comments_cannot_reach_the_engine() {
    let (executor, _) = executor().await;
    assert!(like_is_case_insensitive(&executor).await);

    for sql in [
        "SELECT 1 AS one /* /* */ ; SELECT * FROM missing_table; /* */ */",
        "SELECT 1 AS one /* /* */ ; PRAGMA case_sensitive_like = ON; /* */ */",
    ] {
        match executor.execute(SqlCandidate::new(sql)).await {
            Ok(result) => assert_eq!(result.rows, vec![vec![Value::Int(1)]], "{sql}"),
            Err(err) => assert!(
                matches!(
                    err,
                    ExecutionError::Forbidden(_) | ExecutionError::InvalidStatement(_)
                ) && !err.to_string().contains("missing_table"),
                "{sql}: {err:?}"
            ),
        }
    }

    assert!(like_is_case_insensitive(&executor).await);
}

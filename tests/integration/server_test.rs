//! HTTP surface tests driven through the router without a socket.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use shopinsight::db::{DatabaseClient, FailingDatabaseClient};
use shopinsight::llm::{MockLlmClient, UnavailableLlmClient};
use shopinsight::server::{router, AppState};
use tower::ServiceExt; // for `oneshot`

use super::{pipeline_over, seeded_sqlite};

async fn app_with(llm: MockLlmClient) -> Router {
    let db: Arc<dyn DatabaseClient> = seeded_sqlite().await;
    router(AppState {
        pipeline: pipeline_over(Arc::clone(&db), llm),
        db,
        llm_configured: true,
    })
}

async fn app() -> Router {
    app_with(MockLlmClient::new()).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_ask_total_sales() {
    let body = json!({"question": "What is my total sales?"}).to_string();

    let (status, body) = send(app().await, post_json("/api/ask", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["question"], "What is my total sales?");
    assert_eq!(
        body["sql_query"],
        "SELECT SUM(total_sales) AS total_sales FROM total_sales_metrics;"
    );
    assert_eq!(body["data"][0]["total_sales"].as_f64(), Some(12000.0));
    assert!(body["response"].as_str().unwrap().contains("12000"));
}

#[tokio::test]
async fn test_query_alias_matches_ask() {
    let body = json!({"question": "Which products are ineligible for ads?"}).to_string();

    let (status, body) = send(app().await, post_json("/api/query", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["item_id"], "P005");
}

#[tokio::test]
async fn test_ask_rejects_missing_question() {
    for payload in ["{}", "not json", r#"{"question": 42}"#] {
        let (status, body) = send(app().await, post_json("/api/ask", payload)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(body, json!({"error": "Question is required", "success": false}));
    }
}

#[tokio::test]
async fn test_ask_rejects_blank_question() {
    let (status, body) = send(app().await, post_json("/api/ask", r#"{"question": "   "}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["stage"], "validation");
    assert_eq!(body["error"], "Question is required");
}

#[tokio::test]
async fn test_ask_forbidden_statement() {
    let body = json!({"question": "Delete everything"}).to_string();

    let (status, body) = send(app().await, post_json("/api/ask", &body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["stage"], "executing");
    assert_eq!(body["reason"], "forbidden");
    assert_eq!(body["sql_query"], "DELETE FROM total_sales_metrics");
}

#[tokio::test]
async fn test_ask_with_unavailable_model() {
    let db: Arc<dyn DatabaseClient> = seeded_sqlite().await;
    let app = router(AppState {
        pipeline: pipeline_over(Arc::clone(&db), UnavailableLlmClient::new("No API key")),
        db,
        llm_configured: false,
    });
    let body = json!({"question": "What is my total sales?"}).to_string();

    let (status, body) = send(app, post_json("/api/ask", &body)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["stage"], "generating");
    assert_eq!(body["reason"], "unavailable");
    assert!(body.get("sql_query").is_none());
}

#[tokio::test]
async fn test_stats_endpoint() {
    let (status, body) = send(app().await, get("/api/stats")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], 8);
    assert_eq!(body["eligible_items"], 7);
    assert_eq!(body["total_sales"].as_f64(), Some(12000.0));
}

#[tokio::test]
async fn test_stats_endpoint_store_failure() {
    let db: Arc<dyn DatabaseClient> = Arc::new(FailingDatabaseClient::unreachable());
    let app = router(AppState {
        pipeline: pipeline_over(Arc::clone(&db), MockLlmClient::new()),
        db,
        llm_configured: true,
    });

    let (status, body) = send(app, get("/api/stats")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Could not retrieve stats"}));
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(app().await, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "ok", "database": "connected", "llm": "configured"})
    );
}

#[tokio::test]
async fn test_health_degraded_when_store_unreachable() {
    let db: Arc<dyn DatabaseClient> = Arc::new(FailingDatabaseClient::unreachable());
    let app = router(AppState {
        pipeline: pipeline_over(Arc::clone(&db), MockLlmClient::new()),
        db,
        llm_configured: false,
    });

    let (status, body) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], "unreachable");
    assert_eq!(body["llm"], "unavailable");
}

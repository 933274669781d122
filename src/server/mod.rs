//! HTTP surface.
//!
//! Routes:
//! - `GET  /health`     shallow probe of the store and model configuration
//! - `POST /api/ask`    `{"question": ...}` to an answer
//! - `POST /api/query`  alias of `/api/ask`
//! - `GET  /api/stats`  aggregate figures over the metrics tables

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::db::DatabaseClient;
use crate::error::{InsightError, Result};
use crate::pipeline::Pipeline;

/// State shared by every request.
pub struct AppState {
    pub pipeline: Pipeline,
    pub db: Arc<dyn DatabaseClient>,
    /// False when the model client is a stand-in that always fails.
    pub llm_configured: bool,
}

pub type SharedState = Arc<AppState>;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/ask", post(handlers::ask))
        .route("/api/query", post(handlers::ask))
        .route("/api/stats", get(handlers::stats))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Serves until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| InsightError::config(format!("Cannot bind {addr}: {e}")))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| InsightError::internal(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

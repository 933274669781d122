//! Request handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use crate::error::{ExecutionError, GenerationError, PipelineError};
use crate::pipeline::Answer;
use crate::stats;

use super::SharedState;

#[derive(Debug, Deserialize)]
pub(super) struct AskRequest {
    question: String,
}

/// HTTP status for a finished invocation.
pub(super) fn status_for(answer: &Answer) -> StatusCode {
    match answer.error() {
        None => StatusCode::OK,
        Some(PipelineError::Validation(_)) => StatusCode::BAD_REQUEST,
        Some(PipelineError::Generation(e)) => match e {
            GenerationError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GenerationError::Empty => StatusCode::UNPROCESSABLE_ENTITY,
            GenerationError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        },
        Some(PipelineError::Execution { error, .. }) => match error {
            ExecutionError::Forbidden(_) | ExecutionError::InvalidStatement(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ExecutionError::ConnectionLost(_) => StatusCode::SERVICE_UNAVAILABLE,
            ExecutionError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        },
        Some(PipelineError::Internal { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(super) async fn ask(
    State(state): State<SharedState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Malformed ask request: {rejection}");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Question is required", "success": false})),
            )
                .into_response();
        }
    };

    let answer = state.pipeline.ask(&request.question).await;
    (status_for(&answer), Json(answer)).into_response()
}

pub(super) async fn stats(State(state): State<SharedState>) -> Response {
    match stats::collect(state.db.as_ref()).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            error!("Stats error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Could not retrieve stats"})),
            )
                .into_response()
        }
    }
}

pub(super) async fn health(State(state): State<SharedState>) -> Response {
    let database = state.db.ping().await;
    let llm = if state.llm_configured {
        "configured"
    } else {
        "unavailable"
    };

    match database {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"status": "ok", "database": "connected", "llm": llm})),
        )
            .into_response(),
        Err(e) => {
            warn!("Health check: database unreachable: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "degraded", "database": "unreachable", "llm": llm})),
            )
                .into_response()
        }
    }
}

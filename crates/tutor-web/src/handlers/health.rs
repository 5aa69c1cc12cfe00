//! Liveness probe.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::state::SharedState;

/// GET /health - healthy only while the database answers
pub async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    let database = match state.db.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unreachable");
            format!("error: {e}")
        }
    };
    let healthy = database == "connected";

    let indexer: Value = match state.rag.indexer().health().await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(error = %e, "health check: indexer unreachable");
            Value::String("unreachable".to_string())
        }
    };

    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "database": database,
            "indexer": indexer,
            "llm_model": state.rag.llm().model_id(),
            "timestamp": chrono::Utc::now(),
        })),
    )
}

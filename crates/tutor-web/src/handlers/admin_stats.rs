//! Dashboard counters.

use axum::extract::State;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::Value;
use tutor_common::{ApiError, ApiResponse};
use tutor_db::DashboardStats;
use tutor_rag::IndexerClient;

use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct DashboardReport {
    #[serde(flatten)]
    pub stats: DashboardStats,
    /// Counters reported by the indexer; `null` when it cannot be reached.
    pub indexer: Option<Value>,
}

async fn indexer_stats(indexer: &IndexerClient) -> Option<Value> {
    match indexer.stats().await {
        Ok(stats) => Some(stats),
        Err(e) => {
            tracing::warn!(error = %e, "indexer stats unavailable");
            None
        }
    }
}

/// GET /api/admin/stats
pub async fn dashboard(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.stats.dashboard().await?;
    let indexer = indexer_stats(state.rag.indexer()).await;
    Ok(ApiResponse::ok(DashboardReport { stats, indexer }))
}

/// GET /api/admin/stats/overview
pub async fn overview(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let overview = state.stats.overview().await?;
    Ok(ApiResponse::ok(overview))
}

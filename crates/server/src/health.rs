use autorec_core::EngineStatus;
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;

use crate::api::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub engine: EngineStatus,
    pub collaborative: &'static str,
    pub content_based: &'static str,
    pub items: usize,
    pub inventory_rows: usize,
    pub checked_at: String,
}

/// Liveness plus engine status. A degraded engine still answers 200 because
/// the collaborative path keeps serving.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let summary = state.recommender.summary();

    let payload = HealthResponse {
        status: "online",
        service: "autorec",
        engine: summary.status,
        collaborative: "ready",
        content_based: if state.recommender.content_available() { "ready" } else { "unavailable" },
        items: summary.items,
        inventory_rows: summary.inventory_rows,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

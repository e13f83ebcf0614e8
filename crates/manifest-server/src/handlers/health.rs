use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::types::HealthResponse;
use crate::AppState;

/// Liveness/readiness probe. Reports the store's current item count so a
/// caller can distinguish "server up" from "server up but store empty or
/// unreachable".
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Server is healthy", body = HealthResponse))
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let items_stored = state.orchestrator.metrics.items_stored.load(std::sync::atomic::Ordering::Relaxed);
    Json(HealthResponse { status: "ok", items_stored })
}

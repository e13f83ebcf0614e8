use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use manifest_core::SearchOutcome;

use crate::error::ApiError;
use crate::types::{SearchRequest, SearchResponse};
use crate::AppState;

/// Embed the query, retrieve nearest items, and optionally curate them into
/// a mission plan.
#[utoipa::path(
    post,
    path = "/v1/search",
    tag = "search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 503, description = "Vector store unavailable"),
    )
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .orchestrator
        .search(
            &req.query,
            req.top_k,
            req.category_filter.as_deref(),
            req.synthesize,
            req.user_id,
        )
        .await?;

    let response = match outcome {
        SearchOutcome::Plan(plan) => SearchResponse::from(plan),
        SearchOutcome::Raw(items) => SearchResponse::from(items),
    };
    Ok(Json(response))
}

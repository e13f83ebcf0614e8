use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use manifest_core::{model::category_to_domain, ImageSource};

use crate::error::ApiError;
use crate::types::{IngestRequest, IngestResponse};
use crate::AppState;

/// Extract → embed → upsert a single item from its image URL.
#[utoipa::path(
    post,
    path = "/v1/ingest",
    tag = "ingest",
    request_body = IngestRequest,
    responses(
        (status = 200, description = "Item ingested", body = IngestResponse),
        (status = 502, description = "Upstream extraction/embedding failure"),
    )
)]
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (item_id, context) = state
        .orchestrator
        .ingest(ImageSource::Url(req.image_url.clone()), Some(req.image_url), req.user_id)
        .await?;

    Ok(Json(IngestResponse {
        item_id,
        domain: category_to_domain(&context.inferred_category).to_string(),
        name: context.name,
        category: context.inferred_category,
        utility_summary: context.utility_summary,
        semantic_tags: context.semantic_tags,
    }))
}

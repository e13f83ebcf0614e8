use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use manifest_core::ContainerSpec;

use crate::error::ApiError;
use crate::types::{
    resolve_constraints, ErrorResponse, MultiPackRequest, MultiPackResponse, PackRequest,
    PackResponse,
};
use crate::AppState;

/// Run the full pipeline — semantic search, knapsack optimization, and
/// (optionally) an LLM explanation — for a single container.
#[utoipa::path(
    post,
    path = "/v1/pack",
    tag = "pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Packing result", body = PackResponse),
        (status = 400, description = "Unknown constraint preset", body = ErrorResponse),
    )
)]
pub async fn pack(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PackRequest>,
) -> Result<impl IntoResponse, Response> {
    let constraints = resolve_constraints(req.constraints).map_err(bad_request)?;

    if req.explain {
        let (result, plan) = state
            .orchestrator
            .pack_and_explain(&req.query, &constraints, req.top_k, None, None, req.user_id)
            .await
            .map_err(|e| ApiError::from(e).into_response())?;
        Ok(Json(PackResponse::from_result(result, plan)).into_response())
    } else {
        let result = state
            .orchestrator
            .pack(&req.query, &constraints, req.top_k, None, None, req.user_id)
            .await
            .map_err(|e| ApiError::from(e).into_response())?;
        Ok(Json(PackResponse::from_result(result, None)).into_response())
    }
}

/// Multi-container bin-packing across caller-supplied container specs.
#[utoipa::path(
    post,
    path = "/v1/pack/multi",
    tag = "pack",
    request_body = MultiPackRequest,
    responses(
        (status = 200, description = "Multi-container packing result", body = MultiPackResponse),
        (status = 400, description = "No containers with positive capacity", body = ErrorResponse),
    )
)]
pub async fn pack_multi(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MultiPackRequest>,
) -> Result<impl IntoResponse, Response> {
    let containers: Vec<ContainerSpec> = req
        .containers
        .into_iter()
        .filter(|c| c.max_weight_grams > 0)
        .map(ContainerSpec::from)
        .collect();

    if containers.is_empty() {
        return Err(bad_request(
            "all containers have zero or negative effective capacity".to_string(),
        ));
    }

    let constraints = req.constraints.unwrap_or_default();

    if req.explain {
        let (result, plan) = state
            .orchestrator
            .pack_multi_and_explain(&req.query, &containers, &constraints, req.top_k, None, None, req.user_id)
            .await
            .map_err(|e| ApiError::from(e).into_response())?;
        Ok(Json(MultiPackResponse::from_result(result, plan)).into_response())
    } else {
        let result = state
            .orchestrator
            .pack_multi(&req.query, &containers, &constraints, req.top_k, None, None, req.user_id)
            .await
            .map_err(|e| ApiError::from(e).into_response())?;
        Ok(Json(MultiPackResponse::from_result(result, None)).into_response())
    }
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
}

//! Thin Axum REST surface over the Manifest pipeline: `/v1/ingest`,
//! `/v1/search`, `/v1/pack`, `/v1/pack/multi`, and `/health`.
//!
//! Item/container CRUD and first-class auth are out of scope — the only
//! identity concept here is the optional `MANIFEST_API_KEY` bearer/header
//! check in [`middleware::api_key_auth`].

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod types;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

use manifest_core::Orchestrator;

pub use handlers::{health_check, ingest, pack, pack_multi, search};
pub use middleware::api_key_auth;

/// Shared state handed to every handler.
pub struct AppState {
    pub orchestrator: Orchestrator,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Manifest API",
        version = "0.1.0",
        description = "AI-assisted physical-inventory search and constrained packing."
    ),
    paths(
        handlers::health::health_check,
        handlers::ingest::ingest,
        handlers::search::search,
        handlers::pack::pack,
        handlers::pack::pack_multi,
    ),
    components(schemas(
        types::HealthResponse,
        types::IngestRequest,
        types::IngestResponse,
        types::SearchRequest,
        types::SearchResponse,
        types::SearchResultItem,
        types::PackRequest,
        types::ConstraintsOrPreset,
        types::PackResponse,
        types::PackedItem,
        types::PackStatus,
        types::MultiPackRequest,
        types::MultiPackResponse,
        types::ContainerInput,
        types::ContainerPackedItems,
        types::ErrorResponse,
    )),
    tags(
        (name = "health", description = "Liveness/readiness"),
        (name = "ingest", description = "Item ingestion"),
        (name = "search", description = "Semantic retrieval"),
        (name = "pack", description = "Constrained packing"),
    )
)]
pub struct ApiDoc;

/// Builds the application router: the four pipeline routes plus `/health`,
/// with the API-key middleware applied to the whole surface (the middleware
/// itself exempts `/health` and `/swagger-ui`).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/ingest", post(ingest))
        .route("/v1/search", post(search))
        .route("/v1/pack", post(pack))
        .route("/v1/pack/multi", post(pack_multi))
        .with_state(state)
        .layer(axum::middleware::from_fn(api_key_auth))
}

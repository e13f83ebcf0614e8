//! Integration tests exercising the router end to end with the Static test
//! doubles, so no network access or real credentials are needed.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use manifest_core::{ClipLocalEmbedder, InMemoryVectorStore, ItemContext, Orchestrator, StaticExtractor, StaticSynthesizer};
use manifest_server::{build_router, AppState};

fn sample_context() -> ItemContext {
    ItemContext {
        name: "Wool Beanie".into(),
        inferred_category: "clothing".into(),
        primary_material: Some("wool".into()),
        weight_estimate: Some("light".into()),
        thermal_rating: Some("high".into()),
        water_resistance: None,
        medical_application: None,
        utility_summary: "Keeps your head warm in cold weather".into(),
        semantic_tags: vec!["warmth".into(), "winter".into()],
        durability: None,
        compressibility: None,
        environmental_suitability: None,
        limitations_and_failure_modes: None,
        quantity: 1,
    }
}

fn build_app() -> axum::Router {
    let embedder = Arc::new(ClipLocalEmbedder::new());
    let orchestrator = Orchestrator::new(
        Arc::new(StaticExtractor { context: sample_context() }),
        embedder.clone(),
        Arc::new(InMemoryVectorStore::default()),
        Arc::new(StaticSynthesizer),
        embedder.dimension(),
        1.0,
    )
    .unwrap();
    build_router(Arc::new(AppState { orchestrator }))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_returns_ok() {
    let app = build_app();
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_ingest_then_search_round_trip() {
    let app = build_app();

    let ingest_req = Request::builder()
        .method("POST")
        .uri("/v1/ingest")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "image_url": "https://img.example/beanie.jpg" }).to_string()))
        .unwrap();
    let ingest_resp = app.clone().oneshot(ingest_req).await.unwrap();
    assert_eq!(ingest_resp.status(), StatusCode::OK);
    let ingest_body = body_json(ingest_resp).await;
    assert_eq!(ingest_body["name"], "Wool Beanie");
    assert_eq!(ingest_body["domain"], "clothing");

    let search_req = Request::builder()
        .method("POST")
        .uri("/v1/search")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "query": "warm winter hat", "synthesize": false }).to_string()))
        .unwrap();
    let search_resp = app.oneshot(search_req).await.unwrap();
    assert_eq!(search_resp.status(), StatusCode::OK);
    let search_body = body_json(search_resp).await;
    assert_eq!(search_body["raw_results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_with_synthesis_returns_mission_summary() {
    let app = build_app();
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/ingest")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "image_url": "https://img.example/beanie.jpg" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/search")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "query": "cold weather trip" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body["mission_summary"].as_str().unwrap().contains("cold weather trip"));
}

#[tokio::test]
async fn test_pack_with_preset_name() {
    let app = build_app();
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/ingest")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "image_url": "https://img.example/beanie.jpg" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/pack")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "query": "winter trip", "constraints": "carry_on_luggage" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body["total_weight_grams"].as_u64().is_some());
}

#[tokio::test]
async fn test_pack_with_unknown_preset_returns_400() {
    let app = build_app();
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/pack")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "query": "winter trip", "constraints": "not_a_real_preset" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pack_multi_requires_positive_capacity_containers() {
    let app = build_app();
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/pack/multi")
                .header("content-type", "application/json")
                .body(
                    Body::from(
                        json!({
                            "query": "winter trip",
                            "containers": [{ "container_id": "c1", "name": "Bag", "max_weight_grams": 0 }],
                        })
                        .to_string(),
                    ),
                )
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pack_multi_distributes_across_containers() {
    let app = build_app();
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/ingest")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "image_url": "https://img.example/beanie.jpg" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/pack/multi")
                .header("content-type", "application/json")
                .body(
                    Body::from(
                        json!({
                            "query": "winter trip",
                            "containers": [{ "container_id": "c1", "name": "Bag", "max_weight_grams": 5000 }],
                        })
                        .to_string(),
                    ),
                )
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["containers"].as_array().unwrap().len(), 1);
}

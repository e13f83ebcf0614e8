//! Optional API key authentication.
//!
//! When `MANIFEST_API_KEY` is set, every request except `/health` and
//! `/swagger-ui` must carry a matching `Authorization: Bearer <key>` or
//! `X-Api-Key: <key>` header. When it is unset, authentication is disabled
//! (development mode).

use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::types::ErrorResponse;

const BYPASS_PATHS: &[&str] = &["/health", "/swagger-ui", "/api-docs"];

pub async fn api_key_auth(request: Request<Body>, next: Next) -> Result<Response, impl IntoResponse> {
    let Some(expected_key) = std::env::var("MANIFEST_API_KEY").ok() else {
        return Ok(next.run(request).await);
    };

    let path = request.uri().path();
    if BYPASS_PATHS.iter().any(|bp| path.starts_with(bp)) {
        return Ok(next.run(request).await);
    }

    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let api_key_header = request.headers().get("x-api-key").and_then(|v| v.to_str().ok());

    match bearer.or(api_key_header) {
        Some(key) if key == expected_key => Ok(next.run(request).await),
        Some(_) => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse { error: "invalid API key".into() }),
        )),
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "missing API key: set Authorization: Bearer <key> or X-Api-Key: <key>".into(),
            }),
        )),
    }
}

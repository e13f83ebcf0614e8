//! Maps `manifest_core::Error` onto HTTP responses.
//!
//! Client-caused upstream failures (the vision model or the synthesizer
//! returning unusable content) become 502; the vector store being
//! unreachable becomes 503; everything else is an opaque 500 that never
//! echoes the underlying error text to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use manifest_core::Error as CoreError;

use crate::types::ErrorResponse;

pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            CoreError::ExtractionEmpty | CoreError::ExtractionBadJson { .. } => {
                (StatusCode::BAD_GATEWAY, "vision extraction failed upstream".to_string())
            }
            CoreError::SynthesisEmpty | CoreError::SynthesisBadJson { .. } => {
                (StatusCode::BAD_GATEWAY, "mission synthesis failed upstream".to_string())
            }
            CoreError::EmbedderUnavailable(_) => {
                (StatusCode::BAD_GATEWAY, "embedding provider unavailable".to_string())
            }
            CoreError::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "item store unavailable".to_string())
            }
            CoreError::StoreSchema(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "item store returned an unexpected shape".to_string())
            }
            CoreError::Config(_) => {
                // Unreachable after startup validation; treated as an internal fault if it
                // somehow surfaces mid-request.
                (StatusCode::INTERNAL_SERVER_ERROR, "internal configuration error".to_string())
            }
            CoreError::Http(_) | CoreError::Json(_) | CoreError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        tracing::error!(error = %self.0, "request failed");
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

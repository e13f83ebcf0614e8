//! Error taxonomy for the Manifest ingest/retrieval/packing pipeline.

use thiserror::Error;

/// Errors produced by any stage of the Manifest pipeline.
///
/// Optimizer outcomes (infeasible / timed out) are deliberately **not**
/// represented here: they are recovered into [`crate::model::PackingResult::status`]
/// rather than propagated as exceptions, since a failure to find a perfect pack is
/// an expected, actionable outcome rather than a fault.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("context extraction returned no content")]
    ExtractionEmpty,

    #[error("context extraction returned malformed JSON: {raw_tail}")]
    ExtractionBadJson { raw_tail: String },

    #[error("embedding provider unavailable: {0}")]
    EmbedderUnavailable(String),

    #[error("vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("vector store schema mismatch: {0}")]
    StoreSchema(String),

    #[error("mission synthesis returned no content")]
    SynthesisEmpty,

    #[error("mission synthesis returned malformed JSON: {raw_tail}")]
    SynthesisBadJson { raw_tail: String },

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing VOYAGE_API_KEY".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: missing VOYAGE_API_KEY"
        );
    }

    #[test]
    fn test_error_display_extraction_bad_json() {
        let err = Error::ExtractionBadJson {
            raw_tail: "...not json".to_string(),
        };
        assert!(err.to_string().contains("malformed JSON"));
    }

    #[test]
    fn test_error_from_json() {
        let bad: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: Error = bad.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}

//! Error types for `manifest-migrate`: one variant per failure class instead
//! of reusing `manifest_core::Error` directly, since the migration has its
//! own configuration/CLI surface.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("item {item_id} has no image_url, skipping")]
    MissingImageUrl { item_id: uuid::Uuid },

    #[error("pipeline error: {0}")]
    Pipeline(#[from] manifest_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing VOYAGE_API_KEY".to_string());
        assert_eq!(err.to_string(), "configuration error: missing VOYAGE_API_KEY");
    }

    #[test]
    fn test_error_from_pipeline() {
        let core_err = manifest_core::Error::StoreUnavailable("timeout".into());
        let err: Error = core_err.into();
        assert!(matches!(err, Error::Pipeline(_)));
    }
}

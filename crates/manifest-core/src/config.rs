//! Process-wide configuration, loaded once from the environment and validated at startup.

use figment::providers::Env;
use figment::Figment;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Active multimodal embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    Voyage,
    ClipLocal,
}

impl EmbeddingProvider {
    /// Dimension produced by each provider (§6 / original `EMBEDDING_DIMENSIONS`).
    pub fn dimension(self) -> usize {
        match self {
            EmbeddingProvider::Voyage => 1024,
            EmbeddingProvider::ClipLocal => 512,
        }
    }
}

/// Process-wide configuration (§6 "Configuration" table).
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestConfig {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub voyage_api_key: Option<String>,
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_service_key: Option<String>,
    #[serde(default = "default_embedding_provider")]
    pub embedding_provider: EmbeddingProvider,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_solver_time_limit_seconds")]
    pub solver_time_limit_seconds: f64,
}

fn default_embedding_provider() -> EmbeddingProvider {
    EmbeddingProvider::Voyage
}

fn default_top_k() -> usize {
    15
}

fn default_similarity_threshold() -> f32 {
    0.25
}

fn default_solver_time_limit_seconds() -> f64 {
    5.0
}

impl ManifestConfig {
    /// Loads configuration from the process environment (`MANIFEST_`-prefixed vars,
    /// falling back to the provider-native names used by the underlying services so
    /// existing deployments do not need to rename credentials).
    pub fn from_env() -> Result<Self> {
        let figment = Figment::new()
            .merge(Env::raw().only(&[
                "OPENAI_API_KEY",
                "VOYAGE_API_KEY",
                "SUPABASE_URL",
                "SUPABASE_SERVICE_KEY",
                "EMBEDDING_PROVIDER",
                "DEFAULT_TOP_K",
                "SIMILARITY_THRESHOLD",
                "SOLVER_TIME_LIMIT_SECONDS",
            ]))
            .merge(Env::prefixed("MANIFEST_"));

        let config: ManifestConfig = figment
            .extract()
            .map_err(|e| Error::Config(format!("failed to load configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Startup validation: every warning here is a `Config` error because the
    /// caller has not yet made an external request that could itself surface the
    /// same failure more cheaply.
    pub fn validate(&self) -> Result<()> {
        match self.embedding_provider {
            EmbeddingProvider::Voyage if self.voyage_api_key.is_none() => {
                return Err(Error::Config(
                    "EMBEDDING_PROVIDER=voyage requires VOYAGE_API_KEY".to_string(),
                ))
            }
            _ => {}
        }
        if self.supabase_url.is_none() || self.supabase_service_key.is_none() {
            return Err(Error::Config(
                "SUPABASE_URL and SUPABASE_SERVICE_KEY are required".to_string(),
            ));
        }
        Ok(())
    }

    /// Warnings for optional-but-recommended settings, mirroring the original
    /// `validate_config` advisory pass rather than a hard failure.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.openai_api_key.is_none() {
            warnings.push("OPENAI_API_KEY not set: extraction and synthesis will fail".into());
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_provider_dimensions() {
        assert_eq!(EmbeddingProvider::Voyage.dimension(), 1024);
        assert_eq!(EmbeddingProvider::ClipLocal.dimension(), 512);
    }

    #[test]
    fn test_validate_rejects_missing_voyage_key() {
        let cfg = ManifestConfig {
            openai_api_key: Some("k".into()),
            voyage_api_key: None,
            supabase_url: Some("https://x.supabase.co".into()),
            supabase_service_key: Some("k".into()),
            embedding_provider: EmbeddingProvider::Voyage,
            default_top_k: 15,
            similarity_threshold: 0.25,
            solver_time_limit_seconds: 5.0,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_store_credentials() {
        let cfg = ManifestConfig {
            openai_api_key: None,
            voyage_api_key: Some("k".into()),
            supabase_url: None,
            supabase_service_key: None,
            embedding_provider: EmbeddingProvider::Voyage,
            default_top_k: 15,
            similarity_threshold: 0.25,
            solver_time_limit_seconds: 5.0,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_passes_with_clip_local_and_no_voyage_key() {
        let cfg = ManifestConfig {
            openai_api_key: Some("k".into()),
            voyage_api_key: None,
            supabase_url: Some("https://x.supabase.co".into()),
            supabase_service_key: Some("k".into()),
            embedding_provider: EmbeddingProvider::ClipLocal,
            default_top_k: 15,
            similarity_threshold: 0.25,
            solver_time_limit_seconds: 5.0,
        };
        assert!(cfg.validate().is_ok());
    }
}

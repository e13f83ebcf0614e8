//! Vision-LLM context extraction: turns an image into a structured [`ItemContext`].

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::ItemContext;

/// Source image for extraction/embedding: raw bytes, a local path, or a remote URL.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    Path(String),
    Url(String),
}

const EXTRACTION_SYSTEM_PROMPT: &str = "You are a meticulous inventory cataloger. Given an image \
of a single physical item, respond with a strict JSON object (no markdown fences) describing: \
name, inferred_category (clothing|medical|tech|camping|food|misc), primary_material, \
weight_estimate (ultralight|light|medium|heavy), thermal_rating, water_resistance, \
medical_application, utility_summary (1-2 sentences), semantic_tags (array of short strings), \
durability, compressibility, environmental_suitability, limitations_and_failure_modes, quantity. \
Be specific about materials and flag medical sterility or single-use items explicitly.";

/// Turns an image into a structured semantic profile.
#[async_trait]
pub trait ContextExtractor: Send + Sync {
    async fn extract(&self, image: &ImageSource) -> Result<ItemContext>;

    /// Dispatches each extraction concurrently; a failing item does not poison
    /// the batch — its slot carries the error instead.
    async fn extract_batch(&self, images: &[ImageSource]) -> Vec<Result<ItemContext>> {
        let futures = images.iter().map(|img| self.extract(img));
        futures::future::join_all(futures).await
    }
}

fn mime_for_path(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else {
        "image/jpeg"
    }
}

/// Builds the `image_url`-shaped payload fragment for a chat-completions-style
/// vision request: a data URI for bytes/local files, a bare URL for remote images.
async fn prepare_image_url(image: &ImageSource) -> Result<String> {
    use base64::Engine;

    match image {
        ImageSource::Url(url) => Ok(url.clone()),
        ImageSource::Bytes(bytes) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            Ok(format!("data:image/jpeg;base64,{encoded}"))
        }
        ImageSource::Path(path) => {
            let bytes = tokio::fs::read(Path::new(path)).await?;
            let mime = mime_for_path(path);
            let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
            Ok(format!("data:{mime};base64,{encoded}"))
        }
    }
}

/// Calls an OpenAI-compatible vision chat-completions endpoint.
pub struct OpenAiVisionExtractor {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiVisionExtractor {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: "gpt-5".to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }

    #[cfg(test)]
    fn with_endpoint(api_key: String, endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: "gpt-5".to_string(),
            endpoint,
        }
    }

    fn parse_response(content: &str) -> Result<ItemContext> {
        if content.trim().is_empty() {
            return Err(Error::ExtractionEmpty);
        }
        let mut value: Value = serde_json::from_str(content).map_err(|_| Error::ExtractionBadJson {
            raw_tail: tail(content, 200),
        })?;

        if value.get("name").and_then(Value::as_str).map(str::trim).unwrap_or("").is_empty() {
            if let Some(obj) = value.as_object_mut() {
                obj.remove("name");
            }
        }

        let mut ctx: ItemContext =
            serde_json::from_value(value).map_err(|_| Error::ExtractionBadJson {
                raw_tail: tail(content, 200),
            })?;
        ctx.backfill_name();
        Ok(ctx)
    }
}

fn tail(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        s.chars().skip(char_count - max_chars).collect()
    }
}

#[async_trait]
impl ContextExtractor for OpenAiVisionExtractor {
    async fn extract(&self, image: &ImageSource) -> Result<ItemContext> {
        let image_url = prepare_image_url(image).await?;

        let body = serde_json::json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "reasoning_effort": "medium",
            "max_completion_tokens": 4096,
            "messages": [
                { "role": "system", "content": EXTRACTION_SYSTEM_PROMPT },
                { "role": "user", "content": [
                    { "type": "image_url", "image_url": { "url": image_url, "detail": "high" } }
                ]},
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(Error::Http)?;

        let payload: Value = response.json().await.map_err(Error::Http)?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        Self::parse_response(&content)
    }
}

/// Deterministic test double used in unit and integration tests so extraction
/// logic can be exercised without network access or credentials.
pub struct StaticExtractor {
    pub context: ItemContext,
}

#[async_trait]
impl ContextExtractor for StaticExtractor {
    async fn extract(&self, _image: &ImageSource) -> Result<ItemContext> {
        Ok(self.context.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context() -> ItemContext {
        ItemContext {
            name: "Wool Beanie".into(),
            inferred_category: "clothing".into(),
            primary_material: Some("merino wool".into()),
            weight_estimate: Some("light".into()),
            thermal_rating: Some("high".into()),
            water_resistance: Some("low".into()),
            medical_application: None,
            utility_summary: "Keeps the head warm in cold conditions.".into(),
            semantic_tags: vec!["warmth".into()],
            durability: None,
            compressibility: Some("high".into()),
            environmental_suitability: Some("cold climates".into()),
            limitations_and_failure_modes: None,
            quantity: 1,
        }
    }

    #[tokio::test]
    async fn test_static_extractor_returns_context() {
        let extractor = StaticExtractor { context: sample_context() };
        let result = extractor.extract(&ImageSource::Url("https://x/img.jpg".into())).await.unwrap();
        assert_eq!(result.name, "Wool Beanie");
    }

    #[tokio::test]
    async fn test_extract_batch_preserves_order_and_isolates_failures() {
        let extractor = StaticExtractor { context: sample_context() };
        let images = vec![
            ImageSource::Url("https://x/1.jpg".into()),
            ImageSource::Url("https://x/2.jpg".into()),
        ];
        let results = extractor.extract_batch(&images).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(std::result::Result::is_ok));
    }

    #[test]
    fn test_parse_response_empty_is_extraction_empty() {
        let err = OpenAiVisionExtractor::parse_response("").unwrap_err();
        assert!(matches!(err, Error::ExtractionEmpty));
    }

    #[test]
    fn test_parse_response_bad_json_includes_tail() {
        let err = OpenAiVisionExtractor::parse_response("not json at all").unwrap_err();
        match err {
            Error::ExtractionBadJson { raw_tail } => assert!(raw_tail.contains("not json")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_response_backfills_missing_name() {
        let json = serde_json::json!({
            "inferred_category": "misc",
            "utility_summary": "A small multitool with several folding attachments for repairs.",
        })
        .to_string();
        let ctx = OpenAiVisionExtractor::parse_response(&json).unwrap();
        assert!(!ctx.name.is_empty());
    }

    #[test]
    fn test_mime_for_path_defaults_to_jpeg() {
        assert_eq!(mime_for_path("item.png"), "image/png");
        assert_eq!(mime_for_path("item.unknown"), "image/jpeg");
    }

    #[tokio::test]
    async fn test_with_endpoint_constructs_without_network_call() {
        let _extractor = OpenAiVisionExtractor::with_endpoint("key".into(), "http://localhost:0".into());
    }
}

//! Multimodal embedding: fuses an image and its [`ItemContext`] into a unit-norm vector.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::extractor::ImageSource;
use crate::model::ItemContext;

/// Distinguishes an ingest-time document embedding from a search-time query
/// embedding, mirroring the hosted provider's `input_type` request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingInputKind {
    Document,
    Query,
}

/// Produces unit-L2-normalized dense vectors from (image, context) or text alone.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_item(&self, image: &ImageSource, context: &ItemContext) -> Result<Vec<f32>>;
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;
    fn dimension(&self) -> usize;
}

fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Joins `ItemContext` fields into the labeled-line context text the hosted
/// embedder consumes alongside the image.
pub fn build_context_text(ctx: &ItemContext) -> String {
    let mut lines = vec![
        format!("Item: {}", ctx.name),
        format!("Category: {}", ctx.inferred_category),
        format!("Utility: {}", ctx.utility_summary),
    ];
    if let Some(material) = &ctx.primary_material {
        lines.push(format!("Material: {material}"));
    }
    if let Some(thermal) = &ctx.thermal_rating {
        lines.push(format!("Thermal: {thermal}"));
    }
    if let Some(water) = &ctx.water_resistance {
        lines.push(format!("Water resistance: {water}"));
    }
    if let Some(medical) = &ctx.medical_application {
        lines.push(format!("Medical use: {medical}"));
    }
    if !ctx.semantic_tags.is_empty() {
        lines.push(format!("Tags: {}", ctx.semantic_tags.join(", ")));
    }
    lines.join(". ")
}

async fn image_to_source_bytes(image: &ImageSource) -> Result<Vec<u8>> {
    match image {
        ImageSource::Bytes(bytes) => Ok(bytes.clone()),
        ImageSource::Path(path) => Ok(tokio::fs::read(path).await?),
        ImageSource::Url(url) => {
            let resp = reqwest::get(url).await.map_err(Error::Http)?;
            Ok(resp.bytes().await.map_err(Error::Http)?.to_vec())
        }
    }
}

/// Hosted multimodal embedder (Voyage-shaped): a single request carries an
/// interleaved (image, context-text) input list and an explicit output dimension.
pub struct VoyageEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    output_dimension: usize,
}

impl VoyageEmbedder {
    pub fn new(api_key: String, output_dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: "voyage-multimodal-3.5".to_string(),
            endpoint: "https://api.voyageai.com/v1/multimodalembeddings".to_string(),
            output_dimension,
        }
    }

    async fn request(&self, inputs: serde_json::Value, input_type: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "inputs": [inputs],
            "input_type": input_type,
            "output_dimension": self.output_dimension,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::EmbedderUnavailable(e.to_string()))?;

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::EmbedderUnavailable(e.to_string()))?;

        let vector: Vec<f32> = payload["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| Error::EmbedderUnavailable("missing embedding in response".into()))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        Ok(normalize(vector))
    }
}

#[async_trait]
impl Embedder for VoyageEmbedder {
    async fn embed_item(&self, image: &ImageSource, context: &ItemContext) -> Result<Vec<f32>> {
        let image_url = match image {
            ImageSource::Url(url) => url.clone(),
            other => {
                use base64::Engine;
                let bytes = image_to_source_bytes(other).await?;
                format!(
                    "data:image/jpeg;base64,{}",
                    base64::engine::general_purpose::STANDARD.encode(&bytes)
                )
            }
        };
        let context_text = build_context_text(context);
        let inputs = serde_json::json!([
            { "image_url": image_url },
            { "text": context_text },
        ]);
        self.request(inputs, "document").await
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let inputs = serde_json::json!([{ "text": text }]);
        self.request(inputs, "query").await
    }

    fn dimension(&self) -> usize {
        self.output_dimension
    }
}

/// Local image+text fusion fallback. Since no ONNX/CLIP runtime crate is present
/// anywhere in the codebase this draws from, the image/text encoders are replaced
/// by a deterministic hashed bag-of-bytes feature map — a stand-in that preserves
/// the documented fusion math (`0.6*image + 0.4*text`, each input pre-normalized)
/// without requiring a model file or GPU at test time.
pub struct ClipLocalEmbedder {
    dimension: usize,
}

impl ClipLocalEmbedder {
    pub fn new() -> Self {
        Self { dimension: 512 }
    }

    fn hashed_features(&self, bytes: &[u8]) -> Vec<f32> {
        let mut features = vec![0f32; self.dimension];
        let mut state: u64 = 0xcbf2_9ce4_8422_2325;
        for &byte in bytes {
            state ^= u64::from(byte);
            state = state.wrapping_mul(0x0000_0100_0000_01B3);
            let idx = (state as usize) % self.dimension;
            features[idx] += 1.0;
        }
        normalize(features)
    }
}

impl Default for ClipLocalEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for ClipLocalEmbedder {
    async fn embed_item(&self, image: &ImageSource, context: &ItemContext) -> Result<Vec<f32>> {
        let image_bytes = image_to_source_bytes(image).await?;
        let image_vec = self.hashed_features(&image_bytes);
        let text_vec = self.hashed_features(build_context_text(context).as_bytes());

        let fused: Vec<f32> = image_vec
            .iter()
            .zip(text_vec.iter())
            .map(|(i, t)| 0.6 * i + 0.4 * t)
            .collect();
        Ok(normalize(fused))
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.hashed_features(text.as_bytes()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

//! Vector store adapter: upsert/search/delete against a pgvector-like RPC backend.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{category_to_domain, weight_estimate_grams, EmbeddingResult, ItemContext, RetrievedItem};

const TABLE_NAME: &str = "manifest_items";
const RPC_NAME: &str = "match_manifest_items";

/// Upserts/searches/deletes items against a cosine-KNN-capable backend.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(
        &self,
        result: &EmbeddingResult,
        image_url: &str,
        user_id: Option<Uuid>,
    ) -> Result<Uuid>;

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        category_filter: Option<&str>,
        user_id: Option<Uuid>,
    ) -> Result<Vec<RetrievedItem>>;

    async fn delete(&self, item_id: Uuid) -> Result<()>;

    async fn count(&self) -> Result<u64>;

    /// Enumerates every stored row, for offline maintenance tasks like
    /// re-embedding migrations (`manifest-migrate`) that must walk the whole
    /// table rather than retrieve by similarity.
    async fn list_all(&self) -> Result<Vec<RetrievedItem>>;
}

/// Supabase/PostgREST-backed implementation: talks to `/rest/v1/<table>` for
/// row CRUD and `/rest/v1/rpc/<fn>` for the cosine-KNN search.
pub struct SupabaseVectorStore {
    client: reqwest::Client,
    url: String,
    service_key: String,
}

impl SupabaseVectorStore {
    pub fn new(url: String, service_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            service_key,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/rest/v1/{path}", self.url.trim_end_matches('/'));
        self.client
            .request(method, url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", "application/json")
    }

    fn build_row(result: &EmbeddingResult, image_url: &str, user_id: Option<Uuid>) -> Value {
        let ctx = &result.context;
        let weight_grams = ctx
            .weight_estimate
            .as_deref()
            .map(weight_estimate_grams);
        let domain = category_to_domain(&ctx.inferred_category);

        let mut row = serde_json::json!({
            "id": result.item_id,
            "embedding": result.vector,
            "image_url": image_url,
            "name": ctx.name,
            "domain": domain,
            "category": ctx.inferred_category,
            "primary_material": ctx.primary_material,
            "weight_estimate": ctx.weight_estimate,
            "weight_grams": weight_grams,
            "thermal_rating": ctx.thermal_rating,
            "water_resistance": ctx.water_resistance,
            "medical_application": ctx.medical_application,
            "utility_summary": ctx.utility_summary,
            "semantic_tags": ctx.semantic_tags,
            "durability": ctx.durability,
            "compressibility": ctx.compressibility,
            "environmental_suitability": ctx.environmental_suitability,
            "limitations_and_failure_modes": ctx.limitations_and_failure_modes,
            "quantity": ctx.quantity,
        });
        if let Some(uid) = user_id {
            row["user_id"] = serde_json::json!(uid);
        }
        row
    }

    fn row_to_retrieved(row: &Value) -> Result<RetrievedItem> {
        let item_id: Uuid = row
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::StoreSchema("row missing valid id".into()))?;

        let score = row
            .get("similarity")
            .and_then(Value::as_f64)
            .unwrap_or(0.0) as f32;

        let context = ItemContext {
            name: row.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
            inferred_category: row
                .get("category")
                .and_then(Value::as_str)
                .unwrap_or("misc")
                .to_string(),
            primary_material: row.get("primary_material").and_then(Value::as_str).map(String::from),
            weight_estimate: row.get("weight_estimate").and_then(Value::as_str).map(String::from),
            thermal_rating: row.get("thermal_rating").and_then(Value::as_str).map(String::from),
            water_resistance: row.get("water_resistance").and_then(Value::as_str).map(String::from),
            medical_application: row.get("medical_application").and_then(Value::as_str).map(String::from),
            utility_summary: row
                .get("utility_summary")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            semantic_tags: row
                .get("semantic_tags")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
                .unwrap_or_default(),
            durability: row.get("durability").and_then(Value::as_str).map(String::from),
            compressibility: row.get("compressibility").and_then(Value::as_str).map(String::from),
            environmental_suitability: row
                .get("environmental_suitability")
                .and_then(Value::as_str)
                .map(String::from),
            limitations_and_failure_modes: row
                .get("limitations_and_failure_modes")
                .and_then(Value::as_str)
                .map(String::from),
            quantity: row.get("quantity").and_then(Value::as_u64).map_or(1, |q| q as u32),
        };

        Ok(RetrievedItem {
            item_id,
            score,
            image_url: row.get("image_url").and_then(Value::as_str).map(String::from),
            weight_grams: row.get("weight_grams").and_then(Value::as_u64).map(|w| w as u32),
            context,
        })
    }
}

#[async_trait]
impl VectorStore for SupabaseVectorStore {
    async fn upsert(
        &self,
        result: &EmbeddingResult,
        image_url: &str,
        user_id: Option<Uuid>,
    ) -> Result<Uuid> {
        let row = Self::build_row(result, image_url, user_id);
        let response = self
            .request(reqwest::Method::POST, TABLE_NAME)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&row)
            .send()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::StoreUnavailable(format!(
                "upsert failed with status {}",
                response.status()
            )));
        }
        Ok(result.item_id)
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        category_filter: Option<&str>,
        user_id: Option<Uuid>,
    ) -> Result<Vec<RetrievedItem>> {
        let mut params = serde_json::json!({
            "query_embedding": query_vector,
            "match_count": top_k,
        });
        if let Some(category) = category_filter {
            params["filter_category"] = serde_json::json!(category);
        }
        if let Some(uid) = user_id {
            params["filter_user_id"] = serde_json::json!(uid);
        }

        let response = self
            .request(reqwest::Method::POST, &format!("rpc/{RPC_NAME}"))
            .json(&params)
            .send()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::StoreUnavailable(format!(
                "search RPC failed with status {}",
                response.status()
            )));
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| Error::StoreSchema(e.to_string()))?;

        rows.iter().map(Self::row_to_retrieved).collect()
    }

    async fn delete(&self, item_id: Uuid) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("{TABLE_NAME}?id=eq.{item_id}"))
            .send()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::StoreUnavailable(format!(
                "delete failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        let response = self
            .request(reqwest::Method::HEAD, &format!("{TABLE_NAME}?select=id"))
            .header("Prefer", "count=exact")
            .send()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let content_range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("0/0");

        content_range
            .rsplit('/')
            .next()
            .and_then(|n| n.parse::<u64>().ok())
            .ok_or_else(|| Error::StoreSchema("missing content-range total".into()))
    }

    async fn list_all(&self) -> Result<Vec<RetrievedItem>> {
        let response = self
            .request(reqwest::Method::GET, &format!("{TABLE_NAME}?select=*"))
            .send()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::StoreUnavailable(format!(
                "list failed with status {}",
                response.status()
            )));
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| Error::StoreSchema(e.to_string()))?;

        rows.iter().map(Self::row_to_retrieved).collect()
    }
}

/// In-memory test double used by orchestrator/server tests so they can run
/// without a real Supabase-shaped backend.
#[derive(Default)]
pub struct InMemoryVectorStore {
    rows: tokio::sync::Mutex<HashMap<Uuid, (EmbeddingResult, Option<String>, Option<Uuid>)>>,
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(
        &self,
        result: &EmbeddingResult,
        image_url: &str,
        user_id: Option<Uuid>,
    ) -> Result<Uuid> {
        let mut rows = self.rows.lock().await;
        rows.insert(
            result.item_id,
            (result.clone(), Some(image_url.to_string()), user_id),
        );
        Ok(result.item_id)
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        category_filter: Option<&str>,
        user_id: Option<Uuid>,
    ) -> Result<Vec<RetrievedItem>> {
        let rows = self.rows.lock().await;
        let mut scored: Vec<RetrievedItem> = rows
            .values()
            .filter(|(_, _, uid)| user_id.is_none() || *uid == user_id)
            .filter(|(result, _, _)| {
                category_filter.is_none_or(|cat| result.context.inferred_category == cat)
            })
            .map(|(result, image_url, _)| {
                let score = cosine_similarity(query_vector, &result.vector);
                RetrievedItem {
                    item_id: result.item_id,
                    score,
                    image_url: image_url.clone(),
                    weight_grams: result.context.weight_estimate.as_deref().map(weight_estimate_grams),
                    context: result.context.clone(),
                }
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, item_id: Uuid) -> Result<()> {
        self.rows.lock().await.remove(&item_id);
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.lock().await.len() as u64)
    }

    async fn list_all(&self) -> Result<Vec<RetrievedItem>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .map(|(result, image_url, _)| RetrievedItem {
                item_id: result.item_id,
                score: 0.0,
                image_url: image_url.clone(),
                weight_grams: result.context.weight_estimate.as_deref().map(weight_estimate_grams),
                context: result.context.clone(),
            })
            .collect())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

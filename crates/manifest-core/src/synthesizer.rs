//! Mission synthesis: LLM-based curation of retrieved items into a [`MissionPlan`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{MissionPlan, RetrievedItem};

const SYNTHESIS_SYSTEM_PROMPT: &str = "You are a mission-planning assistant curating physical \
inventory for a stated mission. Select items that genuinely serve the mission and actively \
REJECT items that are dangerous, inappropriate, or redundant for the stated conditions (e.g. \
cotton in cold/wet conditions, summer gear for winter missions, expired medical supplies, \
duplicate items that add weight without added utility). Give a one-sentence reason for every \
selection and rejection. Flag any critical capability gaps. Respond with strict JSON only.";

/// Curates a ranked retrieval set into a mission plan with natural-language rationale.
#[async_trait]
pub trait MissionSynthesizer: Send + Sync {
    async fn synthesize(&self, query: &str, retrieved: &[RetrievedItem]) -> Result<MissionPlan>;
}

#[derive(Debug, Deserialize)]
struct SynthesisIdAndReason {
    item_id: String,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize, Default)]
struct SynthesisResponse {
    #[serde(default)]
    mission_summary: String,
    #[serde(default)]
    selected_items: Vec<SynthesisIdAndReason>,
    #[serde(default)]
    rejected_items: Vec<SynthesisIdAndReason>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    cross_domain_insights: Vec<String>,
}

fn compact_record(item: &RetrievedItem) -> Value {
    let ctx = &item.context;
    serde_json::json!({
        "item_id": item.item_id,
        "name": ctx.name,
        "category": ctx.inferred_category,
        "similarity_score": (item.score * 10000.0).round() / 10000.0,
        "material": ctx.primary_material,
        "thermal_rating": ctx.thermal_rating,
        "water_resistance": ctx.water_resistance,
        "medical_application": ctx.medical_application,
        "utility": ctx.utility_summary,
        "tags": ctx.semantic_tags,
    })
}

/// Reconstructs a [`MissionPlan`] from the LLM's raw selection/rejection lists,
/// looking each id up in the original retrieval set. Unknown ids (the model may
/// hallucinate) are silently dropped.
fn parse_plan(data: SynthesisResponse, retrieved: &[RetrievedItem]) -> MissionPlan {
    let item_map: HashMap<String, &RetrievedItem> = retrieved
        .iter()
        .map(|item| (item.item_id.to_string(), item))
        .collect();

    let mut selected = Vec::new();
    let mut rejected = Vec::new();
    let mut reasoning: HashMap<Uuid, String> = HashMap::new();

    for entry in data.selected_items {
        if let Some(item) = item_map.get(&entry.item_id) {
            selected.push((*item).clone());
            reasoning.insert((*item).item_id, entry.reason);
        }
    }
    for entry in data.rejected_items {
        if let Some(item) = item_map.get(&entry.item_id) {
            rejected.push((*item).clone());
            reasoning.insert((*item).item_id, format!("REJECTED: {}", entry.reason));
        }
    }

    let mut warnings = data.warnings;
    warnings.extend(
        data.cross_domain_insights
            .into_iter()
            .map(|insight| format!("[INSIGHT] {insight}")),
    );

    MissionPlan {
        mission_summary: data.mission_summary,
        selected_items: selected,
        rejected_items: rejected,
        reasoning,
        warnings,
    }
}

fn parse_response_body(content: &str, retrieved: &[RetrievedItem]) -> Result<MissionPlan> {
    if content.trim().is_empty() {
        return Err(Error::SynthesisEmpty);
    }
    let data: SynthesisResponse = serde_json::from_str(content).map_err(|_| Error::SynthesisBadJson {
        raw_tail: tail(content, 200),
    })?;
    Ok(parse_plan(data, retrieved))
}

fn tail(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        s.chars().skip(char_count - max_chars).collect()
    }
}

/// Calls an OpenAI-compatible chat-completions endpoint with the curation prompt.
pub struct OpenAiSynthesizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiSynthesizer {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: "gpt-5".to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }
}

#[async_trait]
impl MissionSynthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, query: &str, retrieved: &[RetrievedItem]) -> Result<MissionPlan> {
        let records: Vec<Value> = retrieved.iter().map(compact_record).collect();
        let user_content = serde_json::json!({
            "mission": query,
            "candidates": records,
        })
        .to_string();

        let body = serde_json::json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "reasoning_effort": "high",
            "max_completion_tokens": 4000,
            "messages": [
                { "role": "system", "content": SYNTHESIS_SYSTEM_PROMPT },
                { "role": "user", "content": user_content },
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

        parse_response_body(&content, retrieved)
    }
}

/// Deterministic test double: selects every retrieved item with a fixed reason.
pub struct StaticSynthesizer;

#[async_trait]
impl MissionSynthesizer for StaticSynthesizer {
    async fn synthesize(&self, query: &str, retrieved: &[RetrievedItem]) -> Result<MissionPlan> {
        let mut reasoning = HashMap::new();
        for item in retrieved {
            reasoning.insert(item.item_id, "relevant to mission".to_string());
        }
        Ok(MissionPlan {
            mission_summary: format!("Plan for: {query}"),
            selected_items: retrieved.to_vec(),
            rejected_items: vec![],
            reasoning,
            warnings: vec![],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemContext;

    fn sample_item(name: &str) -> RetrievedItem {
        RetrievedItem {
            item_id: Uuid::new_v4(),
            score: 0.8,
            image_url: None,
            weight_grams: Some(300),
            context: ItemContext {
                name: name.to_string(),
                inferred_category: "camping".into(),
                primary_material: None,
                weight_estimate: Some("light".into()),
                thermal_rating: None,
                water_resistance: None,
                medical_application: None,
                utility_summary: "test".into(),
                semantic_tags: vec![],
                durability: None,
                compressibility: None,
                environmental_suitability: None,
                limitations_and_failure_modes: None,
                quantity: 1,
            },
        }
    }

    #[test]
    fn test_parse_response_empty_is_synthesis_empty() {
        let err = parse_response_body("", &[]).unwrap_err();
        assert!(matches!(err, Error::SynthesisEmpty));
    }

    #[test]
    fn test_parse_response_bad_json_is_synthesis_bad_json() {
        let err = parse_response_body("not json", &[]).unwrap_err();
        assert!(matches!(err, Error::SynthesisBadJson { .. }));
    }

    #[test]
    fn test_parse_plan_reconciles_selected_and_rejected() {
        let item = sample_item("Tarp");
        let other = sample_item("Cotton Shirt");
        let retrieved = vec![item.clone(), other.clone()];

        let raw = serde_json::json!({
            "mission_summary": "Winter trek",
            "selected_items": [{ "item_id": item.item_id.to_string(), "reason": "keeps you dry" }],
            "rejected_items": [{ "item_id": other.item_id.to_string(), "reason": "cotton retains moisture in cold" }],
            "warnings": ["check battery levels"],
            "cross_domain_insights": ["pair with a waterproof liner"],
        })
        .to_string();

        let plan = parse_response_body(&raw, &retrieved).unwrap();
        assert_eq!(plan.selected_items.len(), 1);
        assert_eq!(plan.rejected_items.len(), 1);
        assert_eq!(plan.reasoning[&item.item_id], "keeps you dry");
        assert!(plan.reasoning[&other.item_id].starts_with("REJECTED: "));
        assert!(plan.warnings.iter().any(|w| w.starts_with("[INSIGHT] ")));
    }

    #[test]
    fn test_parse_plan_drops_unknown_ids() {
        let retrieved = vec![sample_item("Tarp")];
        let raw = serde_json::json!({
            "mission_summary": "x",
            "selected_items": [{ "item_id": Uuid::new_v4().to_string(), "reason": "hallucinated" }],
        })
        .to_string();
        let plan = parse_response_body(&raw, &retrieved).unwrap();
        assert!(plan.selected_items.is_empty());
    }

    #[tokio::test]
    async fn test_static_synthesizer_selects_all() {
        let synthesizer = StaticSynthesizer;
        let retrieved = vec![sample_item("Tarp"), sample_item("Stove")];
        let plan = synthesizer.synthesize("camp trip", &retrieved).await.unwrap();
        assert_eq!(plan.selected_items.len(), 2);
        assert!(plan.rejected_items.is_empty());
    }
}

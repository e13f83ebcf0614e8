//! Domain types shared across ingest, retrieval, and packing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bounded vocabulary for `weight_estimate`; anything else is treated as unknown.
pub const WEIGHT_ESTIMATE_LABELS: &[&str] = &["ultralight", "light", "medium", "heavy"];

/// `weight_estimate` label → grams, per the extraction vocabulary (§6).
pub fn weight_estimate_grams(label: &str) -> u32 {
    match label.to_ascii_lowercase().as_str() {
        "ultralight" => 100,
        "light" => 300,
        "medium" => 700,
        "heavy" => 1500,
        _ => 500,
    }
}

/// `inferred_category` substring → domain, case-insensitive, first match wins.
pub fn category_to_domain(category: &str) -> &'static str {
    let lower = category.to_ascii_lowercase();
    const MAP: &[(&str, &str)] = &[
        ("clothing", "clothing"),
        ("medical", "medical"),
        ("tech", "tech"),
        ("camping", "camping"),
        ("food", "food"),
    ];
    MAP.iter()
        .find(|(needle, _)| lower.contains(needle))
        .map_or("general", |(_, domain)| *domain)
}

/// The semantic profile of a single item, extracted from an image by a vision model.
///
/// `environmental_suitability` and `limitations_and_failure_modes` are carried
/// alongside the fields the retrieval/packing stages consume; they exist purely as
/// richer context for display and future synthesis prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemContext {
    pub name: String,
    pub inferred_category: String,
    #[serde(default)]
    pub primary_material: Option<String>,
    #[serde(default)]
    pub weight_estimate: Option<String>,
    #[serde(default)]
    pub thermal_rating: Option<String>,
    #[serde(default)]
    pub water_resistance: Option<String>,
    #[serde(default)]
    pub medical_application: Option<String>,
    pub utility_summary: String,
    #[serde(default)]
    pub semantic_tags: Vec<String>,
    #[serde(default)]
    pub durability: Option<String>,
    #[serde(default)]
    pub compressibility: Option<String>,
    #[serde(default)]
    pub environmental_suitability: Option<String>,
    #[serde(default)]
    pub limitations_and_failure_modes: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl ItemContext {
    /// Applies the post-parse repair rule from §4.1: if `name` is missing or blank,
    /// synthesize one from the first 80 characters of `utility_summary`.
    pub fn backfill_name(&mut self) {
        if self.name.trim().is_empty() {
            let source = if self.utility_summary.trim().is_empty() {
                "Unnamed item"
            } else {
                self.utility_summary.trim()
            };
            let cut = source.char_indices().nth(80).map_or(source.len(), |(i, _)| i);
            self.name = source[..cut].to_string();
        }
    }
}

/// Output of the ingest pipeline's embedding stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResult {
    #[serde(default = "Uuid::new_v4")]
    pub item_id: Uuid,
    pub vector: Vec<f32>,
    pub dimension: usize,
    pub context: ItemContext,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl EmbeddingResult {
    pub fn new(vector: Vec<f32>, context: ItemContext, image_url: Option<String>) -> Self {
        let dimension = vector.len();
        Self {
            item_id: Uuid::new_v4(),
            vector,
            dimension,
            context,
            image_url,
        }
    }
}

/// A single row returned by the vector store's search RPC, reconstructed into
/// a typed result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedItem {
    pub item_id: Uuid,
    pub score: f32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub weight_grams: Option<u32>,
    pub context: ItemContext,
}

/// Optimizer input: a candidate item stripped down to what the solver needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackableItem {
    pub item_id: Uuid,
    pub name: String,
    pub similarity_score: f32,
    pub weight_grams: u32,
    pub quantity_owned: u32,
    pub category: String,
    pub semantic_tags: Vec<String>,
}

/// Packing constraints for a single bin (or, with `solve_multi`, applied per-bin
/// plus across bins).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackingConstraints {
    pub max_weight_grams: u32,
    #[serde(default)]
    pub category_minimums: HashMap<String, u32>,
    #[serde(default)]
    pub category_maximums: HashMap<String, u32>,
    #[serde(default)]
    pub tag_minimums: HashMap<String, u32>,
    #[serde(default)]
    pub max_per_item: Option<u32>,
    #[serde(default)]
    pub pinned_items: Vec<Uuid>,
}

/// A single physical container in a multi-bin packing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub container_id: String,
    pub name: String,
    /// Effective capacity: declared max weight minus tare weight.
    pub max_weight_grams: u32,
}

/// Optimizer solve status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackingStatus {
    Optimal,
    Feasible,
    Infeasible,
}

/// Result of a single-bin solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingResult {
    pub packed_items: Vec<(PackableItem, u32)>,
    pub unpacked_items: Vec<PackableItem>,
    pub total_weight_grams: u32,
    pub total_similarity_score: f32,
    pub weight_utilization: f32,
    pub status: PackingStatus,
    pub solver_time_ms: u64,
    pub relaxed_constraints: Vec<String>,
}

/// One container's share of a multi-bin solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerPackingResult {
    pub container_id: String,
    pub container_name: String,
    pub max_weight_grams: u32,
    pub packed_items: Vec<(PackableItem, u32)>,
    pub total_weight_grams: u32,
    pub weight_utilization: f32,
}

/// Result of a multi-bin solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiPackingResult {
    pub containers: Vec<ContainerPackingResult>,
    pub unpacked_items: Vec<PackableItem>,
    pub total_similarity_score: f32,
    pub status: PackingStatus,
    pub solver_time_ms: u64,
    pub relaxed_constraints: Vec<String>,
}

/// A curated mission recommendation produced by the synthesizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissionPlan {
    pub mission_summary: String,
    pub selected_items: Vec<RetrievedItem>,
    pub rejected_items: Vec<RetrievedItem>,
    pub reasoning: HashMap<Uuid, String>,
    pub warnings: Vec<String>,
}

//! HTTP request/response DTOs for the Manifest REST API.
//!
//! These mirror `manifest_core::model` shapes but are kept separate so the
//! wire contract can evolve independently of the pipeline's internal types
//! (same split the original Flutter-facing `schemas.py` made from the
//! `ai_modules` models it wrapped).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use manifest_core::{
    ContainerPackingResult, ContainerSpec, MissionPlan, MultiPackingResult, PackableItem,
    PackingConstraints, PackingResult, PackingStatus, RetrievedItem,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------
// Ingest
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct IngestRequest {
    /// Public URL of the image (e.g. Supabase Storage).
    pub image_url: String,
    /// Owner user ID (from Supabase Auth).
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    pub item_id: Uuid,
    pub name: String,
    pub domain: String,
    pub category: String,
    pub utility_summary: String,
    pub semantic_tags: Vec<String>,
}

// ---------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_search_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub category_filter: Option<String>,
    #[serde(default = "default_true")]
    pub synthesize: bool,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

fn default_search_top_k() -> usize {
    15
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResultItem {
    pub item_id: Uuid,
    pub name: String,
    pub score: f32,
    pub image_url: Option<String>,
    pub category: String,
    pub utility_summary: String,
    pub semantic_tags: Vec<String>,
    pub reason: Option<String>,
}

fn retrieved_to_result(item: &RetrievedItem, reason: Option<String>) -> SearchResultItem {
    SearchResultItem {
        item_id: item.item_id,
        name: item.context.name.clone(),
        score: item.score,
        image_url: item.image_url.clone(),
        category: item.context.inferred_category.clone(),
        utility_summary: item.context.utility_summary.clone(),
        semantic_tags: item.context.semantic_tags.clone(),
        reason,
    }
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct SearchResponse {
    #[serde(default)]
    pub mission_summary: Option<String>,
    #[serde(default)]
    pub selected_items: Vec<SearchResultItem>,
    #[serde(default)]
    pub rejected_items: Vec<SearchResultItem>,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Populated when `synthesize=false`, or when synthesis degraded.
    #[serde(default)]
    pub raw_results: Vec<SearchResultItem>,
}

impl From<Vec<RetrievedItem>> for SearchResponse {
    fn from(raw: Vec<RetrievedItem>) -> Self {
        SearchResponse {
            raw_results: raw.iter().map(|item| retrieved_to_result(item, None)).collect(),
            ..Default::default()
        }
    }
}

impl From<MissionPlan> for SearchResponse {
    fn from(plan: MissionPlan) -> Self {
        let selected_items = plan
            .selected_items
            .iter()
            .map(|item| retrieved_to_result(item, plan.reasoning.get(&item.item_id).cloned()))
            .collect();
        let rejected_items = plan
            .rejected_items
            .iter()
            .map(|item| retrieved_to_result(item, plan.reasoning.get(&item.item_id).cloned()))
            .collect();
        SearchResponse {
            mission_summary: Some(plan.mission_summary),
            selected_items,
            rejected_items,
            warnings: plan.warnings,
            raw_results: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------
// Pack
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ConstraintsOrPreset {
    Preset(String),
    Custom(#[schema(value_type = Object)] PackingConstraints),
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PackRequest {
    pub query: String,
    pub constraints: ConstraintsOrPreset,
    #[serde(default = "default_pack_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub explain: bool,
}

fn default_pack_top_k() -> usize {
    30
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PackedItem {
    pub item_id: Uuid,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub weight_grams: u32,
    pub similarity_score: f32,
    pub semantic_tags: Vec<String>,
}

impl From<&(PackableItem, u32)> for PackedItem {
    fn from((item, qty): &(PackableItem, u32)) -> Self {
        PackedItem {
            item_id: item.item_id,
            name: item.name.clone(),
            category: item.category.clone(),
            quantity: *qty,
            weight_grams: item.weight_grams,
            similarity_score: item.similarity_score,
            semantic_tags: item.semantic_tags.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PackStatus {
    Optimal,
    Feasible,
    Infeasible,
}

impl From<PackingStatus> for PackStatus {
    fn from(status: PackingStatus) -> Self {
        match status {
            PackingStatus::Optimal => PackStatus::Optimal,
            PackingStatus::Feasible => PackStatus::Feasible,
            PackingStatus::Infeasible => PackStatus::Infeasible,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PackResponse {
    pub status: PackStatus,
    pub packed_items: Vec<PackedItem>,
    pub total_weight_grams: u32,
    pub total_similarity_score: f32,
    pub weight_utilization: f32,
    pub solver_time_ms: u64,
    #[serde(default)]
    pub relaxed_constraints: Vec<String>,
    #[serde(default)]
    pub mission_summary: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl PackResponse {
    pub fn from_result(result: PackingResult, plan: Option<MissionPlan>) -> Self {
        PackResponse {
            status: result.status.into(),
            packed_items: result.packed_items.iter().map(PackedItem::from).collect(),
            total_weight_grams: result.total_weight_grams,
            total_similarity_score: result.total_similarity_score,
            weight_utilization: result.weight_utilization,
            solver_time_ms: result.solver_time_ms,
            relaxed_constraints: result.relaxed_constraints,
            mission_summary: plan.as_ref().map(|p| p.mission_summary.clone()),
            warnings: plan.map(|p| p.warnings).unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------
// Multi-container pack
// ---------------------------------------------------------------------

/// A caller-supplied container to pack into.
///
/// Unlike the original prototype, there is no container CRUD surface here
/// (out of scope) — the caller passes container specs directly in the
/// request instead of referencing stored container ids.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ContainerInput {
    pub container_id: String,
    pub name: String,
    pub max_weight_grams: u32,
}

impl From<ContainerInput> for ContainerSpec {
    fn from(c: ContainerInput) -> Self {
        ContainerSpec {
            container_id: c.container_id,
            name: c.name,
            max_weight_grams: c.max_weight_grams,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MultiPackRequest {
    pub query: String,
    pub containers: Vec<ContainerInput>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub constraints: Option<PackingConstraints>,
    #[serde(default = "default_pack_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub category_filter: Option<String>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub explain: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContainerPackedItems {
    pub container_id: String,
    pub container_name: String,
    pub max_weight_grams: u32,
    pub packed_items: Vec<PackedItem>,
    pub total_weight_grams: u32,
    pub weight_utilization: f32,
}

impl From<&ContainerPackingResult> for ContainerPackedItems {
    fn from(c: &ContainerPackingResult) -> Self {
        ContainerPackedItems {
            container_id: c.container_id.clone(),
            container_name: c.container_name.clone(),
            max_weight_grams: c.max_weight_grams,
            packed_items: c.packed_items.iter().map(PackedItem::from).collect(),
            total_weight_grams: c.total_weight_grams,
            weight_utilization: c.weight_utilization,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MultiPackResponse {
    pub status: PackStatus,
    pub containers: Vec<ContainerPackedItems>,
    pub total_weight_grams: u32,
    pub total_similarity_score: f32,
    pub solver_time_ms: u64,
    #[serde(default)]
    pub relaxed_constraints: Vec<String>,
    #[serde(default)]
    pub unpacked_items: Vec<PackedItem>,
    #[serde(default)]
    pub mission_summary: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl MultiPackResponse {
    pub fn from_result(result: MultiPackingResult, plan: Option<MissionPlan>) -> Self {
        let total_weight_grams = result.containers.iter().map(|c| c.total_weight_grams).sum();
        MultiPackResponse {
            status: result.status.into(),
            containers: result.containers.iter().map(ContainerPackedItems::from).collect(),
            total_weight_grams,
            total_similarity_score: result.total_similarity_score,
            solver_time_ms: result.solver_time_ms,
            relaxed_constraints: result.relaxed_constraints,
            unpacked_items: result
                .unpacked_items
                .iter()
                .map(|item| PackedItem::from(&(item.clone(), 1)))
                .collect(),
            mission_summary: plan.as_ref().map(|p| p.mission_summary.clone()),
            warnings: plan.map(|p| p.warnings).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub items_stored: u64,
}

/// Presets keyed by name, used to resolve `ConstraintsOrPreset::Preset`.
pub fn resolve_constraints(value: ConstraintsOrPreset) -> Result<PackingConstraints, String> {
    match value {
        ConstraintsOrPreset::Custom(c) => Ok(c),
        ConstraintsOrPreset::Preset(name) => manifest_core::constraint_preset(&name)
            .ok_or_else(|| format!("unknown constraint preset '{name}'")),
    }
}

//! Wires extraction, embedding, storage, synthesis, and packing into the
//! three flows a caller drives: ingest, search, pack.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::embedder::Embedder;
use crate::error::{Error, Result};
use crate::extractor::{ContextExtractor, ImageSource};
use crate::metrics::OperationalMetrics;
use crate::model::{
    ContainerSpec, EmbeddingResult, ItemContext, MissionPlan, MultiPackingResult, PackingConstraints,
    PackingResult, RetrievedItem,
};
use crate::optimizer::{constraint_preset, retrieved_to_packable, KnapsackOptimizer};
use crate::store::VectorStore;
use crate::synthesizer::MissionSynthesizer;

/// Inter-item pacing for `ingest_batch`, matching the documented 500 ms
/// backpressure budget so batch ingest stays under provider rate limits.
const INGEST_BATCH_DELAY: Duration = Duration::from_millis(500);

/// Either a curated mission plan or the raw retrieval list, depending on
/// whether synthesis was requested and whether it succeeded.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Plan(MissionPlan),
    Raw(Vec<RetrievedItem>),
}

/// Wires the extractor, embedder, store, synthesizer, and optimizer into the
/// three pipeline entry points. Constructed once at startup; safe for
/// concurrent use by multiple in-flight requests.
pub struct Orchestrator {
    extractor: Arc<dyn ContextExtractor>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    synthesizer: Arc<dyn MissionSynthesizer>,
    optimizer: KnapsackOptimizer,
    pub metrics: Arc<OperationalMetrics>,
}

impl Orchestrator {
    /// Validates that the active embedder's dimension matches the store's
    /// configured dimension before returning — a mismatch is a fatal
    /// configuration error, not something discovered mid-request.
    pub fn new(
        extractor: Arc<dyn ContextExtractor>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        synthesizer: Arc<dyn MissionSynthesizer>,
        expected_dimension: usize,
        solver_time_limit_seconds: f64,
    ) -> Result<Self> {
        if embedder.dimension() != expected_dimension {
            return Err(Error::Config(format!(
                "embedder dimension {} does not match configured store dimension {}",
                embedder.dimension(),
                expected_dimension
            )));
        }
        Ok(Self {
            extractor,
            embedder,
            store,
            synthesizer,
            optimizer: KnapsackOptimizer::new(solver_time_limit_seconds),
            metrics: OperationalMetrics::shared(),
        })
    }

    /// Extractor → Embedder → Store.upsert. Returns the assigned id and the
    /// extracted context so the caller can confirm/display it.
    pub async fn ingest(
        &self,
        image: ImageSource,
        image_url: Option<String>,
        user_id: Option<Uuid>,
    ) -> Result<(Uuid, ItemContext)> {
        self.metrics.inc_ingest();
        let result = self.ingest_inner(image, image_url, user_id).await;
        if result.is_err() {
            self.metrics.inc_ingest_error();
        }
        result
    }

    async fn ingest_inner(
        &self,
        image: ImageSource,
        image_url: Option<String>,
        user_id: Option<Uuid>,
    ) -> Result<(Uuid, ItemContext)> {
        let context = self.extractor.extract(&image).await?;
        let vector = self.embedder.embed_item(&image, &context).await?;
        let embedding = EmbeddingResult::new(vector, context.clone(), image_url.clone());
        let item_id = self
            .store
            .upsert(&embedding, image_url.as_deref().unwrap_or(""), user_id)
            .await?;
        Ok((item_id, context))
    }

    /// Sequential ingest over multiple images, paced to stay under provider
    /// rate limits. Per-item failures are logged and skipped rather than
    /// aborting the whole batch.
    pub async fn ingest_batch(
        &self,
        images: Vec<ImageSource>,
        user_id: Option<Uuid>,
    ) -> Vec<Result<(Uuid, ItemContext)>> {
        let mut results = Vec::with_capacity(images.len());
        let mut images = images.into_iter().peekable();
        while let Some(image) = images.next() {
            let outcome = self.ingest(image, None, user_id).await;
            if let Err(ref err) = outcome {
                tracing::warn!(error = %err, "ingest_batch: item failed, continuing");
            }
            results.push(outcome);
            if images.peek().is_some() {
                tokio::time::sleep(INGEST_BATCH_DELAY).await;
            }
        }
        results
    }

    /// Embed → Store.search → (optional) Synthesizer. Synthesis failures
    /// degrade to the raw retrieval list rather than failing the request.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        category_filter: Option<&str>,
        synthesize: bool,
        user_id: Option<Uuid>,
    ) -> Result<SearchOutcome> {
        self.metrics.inc_search();
        let outcome = self.search_inner(query, top_k, category_filter, synthesize, user_id).await;
        if outcome.is_err() {
            self.metrics.inc_search_error();
        }
        outcome
    }

    async fn search_inner(
        &self,
        query: &str,
        top_k: usize,
        category_filter: Option<&str>,
        synthesize: bool,
        user_id: Option<Uuid>,
    ) -> Result<SearchOutcome> {
        let query_vector = self.embedder.embed_text(query).await?;
        let retrieved = self.store.search(&query_vector, top_k, category_filter, user_id).await?;

        if !synthesize {
            return Ok(SearchOutcome::Raw(retrieved));
        }

        match self.synthesizer.synthesize(query, &retrieved).await {
            Ok(plan) => Ok(SearchOutcome::Plan(plan)),
            Err(err) => {
                tracing::warn!(error = %err, "search: synthesis failed, degrading to raw results");
                self.metrics.inc_synthesis_degraded();
                Ok(SearchOutcome::Raw(retrieved))
            }
        }
    }

    /// Search (synthesize=false, larger k) → retrievedToPackable → solve.
    pub async fn pack(
        &self,
        query: &str,
        constraints: &PackingConstraints,
        top_k: usize,
        inventory: Option<&HashMap<Uuid, u32>>,
        weight_overrides: Option<&HashMap<Uuid, u32>>,
        user_id: Option<Uuid>,
    ) -> Result<PackingResult> {
        self.metrics.inc_pack();
        let retrieved = self.retrieve_for_packing(query, top_k, user_id).await?;
        let packable = retrieved_to_packable(&retrieved, inventory, weight_overrides);
        let result = tokio::task::spawn_blocking({
            let optimizer_time_limit = self.optimizer.time_limit_seconds;
            let constraints = constraints.clone();
            move || KnapsackOptimizer::new(optimizer_time_limit).solve(&packable, &constraints)
        })
        .await
        .map_err(|e| Error::Config(format!("optimizer task panicked: {e}")))?;

        if result.status == crate::model::PackingStatus::Infeasible {
            self.metrics.inc_pack_infeasible();
        }
        Ok(result)
    }

    /// `pack` followed by a synthesizer call over the packed + up-to-10
    /// unpacked items, with an augmented query so the LLM's explanation
    /// matches the optimizer's numeric result.
    pub async fn pack_and_explain(
        &self,
        query: &str,
        constraints: &PackingConstraints,
        top_k: usize,
        inventory: Option<&HashMap<Uuid, u32>>,
        weight_overrides: Option<&HashMap<Uuid, u32>>,
        user_id: Option<Uuid>,
    ) -> Result<(PackingResult, Option<MissionPlan>)> {
        let result = self.pack(query, constraints, top_k, inventory, weight_overrides, user_id).await?;
        let plan = self.explain_packing(query, &result).await;
        Ok((result, plan))
    }

    /// Multi-bin variant of `pack`.
    pub async fn pack_multi(
        &self,
        query: &str,
        containers: &[ContainerSpec],
        constraints: &PackingConstraints,
        top_k: usize,
        inventory: Option<&HashMap<Uuid, u32>>,
        weight_overrides: Option<&HashMap<Uuid, u32>>,
        user_id: Option<Uuid>,
    ) -> Result<MultiPackingResult> {
        self.metrics.inc_pack();
        let retrieved = self.retrieve_for_packing(query, top_k, user_id).await?;
        let packable = retrieved_to_packable(&retrieved, inventory, weight_overrides);
        let containers = containers.to_vec();
        let result = tokio::task::spawn_blocking({
            let optimizer_time_limit = self.optimizer.time_limit_seconds;
            let constraints = constraints.clone();
            move || KnapsackOptimizer::new(optimizer_time_limit).solve_multi(&packable, &containers, &constraints)
        })
        .await
        .map_err(|e| Error::Config(format!("optimizer task panicked: {e}")))?;

        if result.status == crate::model::PackingStatus::Infeasible {
            self.metrics.inc_pack_infeasible();
        }
        Ok(result)
    }

    /// Multi-bin variant of `pack_and_explain`.
    pub async fn pack_multi_and_explain(
        &self,
        query: &str,
        containers: &[ContainerSpec],
        constraints: &PackingConstraints,
        top_k: usize,
        inventory: Option<&HashMap<Uuid, u32>>,
        weight_overrides: Option<&HashMap<Uuid, u32>>,
        user_id: Option<Uuid>,
    ) -> Result<(MultiPackingResult, Option<MissionPlan>)> {
        let result = self
            .pack_multi(query, containers, constraints, top_k, inventory, weight_overrides, user_id)
            .await?;

        let packed_for_explain: Vec<RetrievedItem> = result
            .containers
            .iter()
            .flat_map(|c| c.packed_items.iter())
            .map(|(item, _)| packable_to_retrieved(item))
            .collect();
        let unpacked_for_explain: Vec<RetrievedItem> =
            result.unpacked_items.iter().take(10).map(packable_to_retrieved).collect();

        let mut combined = packed_for_explain;
        combined.extend(unpacked_for_explain);

        let augmented_query = format!(
            "{query} (packing result: status={:?}, relaxed constraints: {})",
            result.status,
            result.relaxed_constraints.join("; ")
        );

        let plan = self.synthesizer.synthesize(&augmented_query, &combined).await.ok();
        Ok((result, plan))
    }

    async fn retrieve_for_packing(
        &self,
        query: &str,
        top_k: usize,
        user_id: Option<Uuid>,
    ) -> Result<Vec<RetrievedItem>> {
        match self.search(query, top_k, None, false, user_id).await? {
            SearchOutcome::Raw(items) => Ok(items),
            SearchOutcome::Plan(_) => unreachable!("pack always searches with synthesize=false"),
        }
    }

    async fn explain_packing(&self, query: &str, result: &PackingResult) -> Option<MissionPlan> {
        let packed: Vec<RetrievedItem> = result.packed_items.iter().map(|(item, _)| packable_to_retrieved(item)).collect();
        let unpacked: Vec<RetrievedItem> = result.unpacked_items.iter().take(10).map(packable_to_retrieved).collect();

        let mut combined = packed;
        combined.extend(unpacked);

        let augmented_query = format!(
            "{query} (packing result: status={:?}, weight_utilization={:.2}, relaxed constraints: {})",
            result.status,
            result.weight_utilization,
            result.relaxed_constraints.join("; ")
        );

        self.synthesizer.synthesize(&augmented_query, &combined).await.ok()
    }

    /// Resolves a constraint preset by name (§6).
    pub fn preset(name: &str) -> Option<PackingConstraints> {
        constraint_preset(name)
    }
}

fn packable_to_retrieved(item: &crate::model::PackableItem) -> RetrievedItem {
    RetrievedItem {
        item_id: item.item_id,
        score: item.similarity_score,
        image_url: None,
        weight_grams: Some(item.weight_grams),
        context: ItemContext {
            name: item.name.clone(),
            inferred_category: item.category.clone(),
            primary_material: None,
            weight_estimate: None,
            thermal_rating: None,
            water_resistance: None,
            medical_application: None,
            utility_summary: String::new(),
            semantic_tags: item.semantic_tags.clone(),
            durability: None,
            compressibility: None,
            environmental_suitability: None,
            limitations_and_failure_modes: None,
            quantity: 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::ClipLocalEmbedder;
    use crate::extractor::StaticExtractor;
    use crate::store::InMemoryVectorStore;
    use crate::synthesizer::StaticSynthesizer;

    fn sample_context(name: &str, category: &str) -> ItemContext {
        ItemContext {
            name: name.to_string(),
            inferred_category: category.to_string(),
            primary_material: None,
            weight_estimate: Some("light".into()),
            thermal_rating: None,
            water_resistance: None,
            medical_application: None,
            utility_summary: "test item".into(),
            semantic_tags: vec!["test".into()],
            durability: None,
            compressibility: None,
            environmental_suitability: None,
            limitations_and_failure_modes: None,
            quantity: 1,
        }
    }

    fn build_orchestrator(context: ItemContext) -> Orchestrator {
        let embedder = Arc::new(ClipLocalEmbedder::new());
        Orchestrator::new(
            Arc::new(StaticExtractor { context }),
            embedder.clone(),
            Arc::new(InMemoryVectorStore::default()),
            Arc::new(StaticSynthesizer),
            embedder.dimension(),
            1.0,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_ingest_then_search_round_trip() {
        let orchestrator = build_orchestrator(sample_context("Tarp", "camping"));
        let (item_id, ctx) = orchestrator
            .ingest(ImageSource::Bytes(vec![1, 2, 3]), Some("https://img".into()), None)
            .await
            .unwrap();
        assert_eq!(ctx.name, "Tarp");

        let outcome = orchestrator.search("camp trip", 10, None, false, None).await.unwrap();
        match outcome {
            SearchOutcome::Raw(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].item_id, item_id);
            }
            SearchOutcome::Plan(_) => panic!("expected raw results when synthesize=false"),
        }
    }

    #[tokio::test]
    async fn test_search_with_synthesis_returns_plan() {
        let orchestrator = build_orchestrator(sample_context("Tarp", "camping"));
        orchestrator.ingest(ImageSource::Bytes(vec![1, 2, 3]), None, None).await.unwrap();
        let outcome = orchestrator.search("camp trip", 10, None, true, None).await.unwrap();
        assert!(matches!(outcome, SearchOutcome::Plan(_)));
    }

    #[tokio::test]
    async fn test_ingest_batch_paces_and_continues_on_failure() {
        let orchestrator = build_orchestrator(sample_context("Tarp", "camping"));
        let images = vec![ImageSource::Bytes(vec![1]), ImageSource::Bytes(vec![2])];
        let results = orchestrator.ingest_batch(images, None).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(std::result::Result::is_ok));
    }

    #[tokio::test]
    async fn test_pack_returns_result_within_weight_cap() {
        let orchestrator = build_orchestrator(sample_context("Tarp", "camping"));
        orchestrator.ingest(ImageSource::Bytes(vec![1, 2, 3]), None, None).await.unwrap();

        let constraints = PackingConstraints { max_weight_grams: 1000, ..Default::default() };
        let result = orchestrator.pack("camp trip", &constraints, 10, None, None, None).await.unwrap();
        assert!(result.total_weight_grams <= 1000);
    }

    #[tokio::test]
    async fn test_new_rejects_embedder_dimension_mismatch() {
        let embedder = Arc::new(ClipLocalEmbedder::new());
        let result = Orchestrator::new(
            Arc::new(StaticExtractor { context: sample_context("x", "misc") }),
            embedder,
            Arc::new(InMemoryVectorStore::default()),
            Arc::new(StaticSynthesizer),
            999,
            1.0,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

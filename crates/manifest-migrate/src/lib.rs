//! Re-embedding migration: walks every row in the vector store, re-runs
//! extraction and embedding, and upserts the row back under its original id.
//!
//! Ported from `examples/original_source/backend/scripts/reembed_all_items.py`:
//! same five-step per-item flow (fetch, re-extract, re-embed, delete, insert
//! with the original id), the same `--dry-run`/`--only-missing`/`--delay`
//! knobs, and the same "log and keep going" per-item failure handling.

pub mod error;

use std::sync::Arc;
use std::time::{Duration, Instant};

use manifest_core::{ContextExtractor, Embedder, ImageSource, RetrievedItem, VectorStore};

pub use error::{Error, Result};

/// CLI-level knobs, mirroring the original script's `argparse` flags.
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    /// Print what would happen without touching the store.
    pub dry_run: bool,
    /// Only re-embed items missing the newer context fields.
    pub only_missing: bool,
    /// Delay between items, for provider rate limiting.
    pub delay: Duration,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self { dry_run: false, only_missing: false, delay: Duration::from_secs(1) }
    }
}

/// Summary printed at the end of a run, mirroring the original script's
/// closing `Total / Success / Failed / Time` log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// True if an item predates the richer context fields introduced after the
/// original rows were written — the closest available proxy in this schema
/// for the original's `activity_contexts`/`unsuitable_contexts` columns,
/// which this crate's `ItemContext` does not carry.
fn needs_reembedding(item: &RetrievedItem) -> bool {
    item.context.environmental_suitability.is_none() || item.context.limitations_and_failure_modes.is_none()
}

/// Re-extracts and re-embeds every (or every outdated) row in the store.
pub struct Migrator {
    extractor: Arc<dyn ContextExtractor>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Migrator {
    pub fn new(extractor: Arc<dyn ContextExtractor>, embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { extractor, embedder, store }
    }

    pub async fn run(&self, options: &MigrationOptions) -> Result<MigrationSummary> {
        tracing::info!("=== Re-Embed All Items ===");
        tracing::info!("Mode: {}", if options.dry_run { "DRY RUN" } else { "LIVE" });
        tracing::info!(
            "Filter: {}",
            if options.only_missing { "only missing fields" } else { "all items" }
        );

        tracing::info!("Fetching items from the store...");
        let mut items = self.store.list_all().await?;
        if options.only_missing {
            items.retain(needs_reembedding);
        }
        tracing::info!("Found {} items to re-embed", items.len());

        if items.is_empty() {
            tracing::info!("Nothing to do!");
            return Ok(MigrationSummary { total: 0, success: 0, failed: 0, skipped: 0 });
        }

        let start = Instant::now();
        let mut success = 0usize;
        let mut failed = 0usize;
        let mut skipped = 0usize;
        let total = items.len();

        for (i, item) in items.iter().enumerate() {
            tracing::info!("[{}/{}] Processing {} ({})", i + 1, total, item.item_id, item.context.name);
            match self.reembed_item(item, options.dry_run).await {
                Ok(true) => success += 1,
                Ok(false) => skipped += 1,
                Err(err) => {
                    tracing::error!("  FAILED: {err}");
                    failed += 1;
                }
            }

            if !options.dry_run && i + 1 < total {
                tokio::time::sleep(options.delay).await;
            }
        }

        let elapsed = start.elapsed();
        tracing::info!("=== Complete ===");
        tracing::info!("Total: {total} | Success: {success} | Failed: {failed} | Skipped: {skipped}");
        tracing::info!(
            "Time: {:.1}s ({:.1}s per item)",
            elapsed.as_secs_f64(),
            elapsed.as_secs_f64() / total.max(1) as f64
        );

        Ok(MigrationSummary { total, success, failed, skipped })
    }

    /// Returns `Ok(true)` on a real re-embed, `Ok(false)` when the item was
    /// skipped (no `image_url`, or a no-op dry run), `Err` on failure.
    async fn reembed_item(&self, item: &RetrievedItem, dry_run: bool) -> Result<bool> {
        let Some(image_url) = item.image_url.clone() else {
            tracing::warn!("  SKIP {} ({}): no image_url", item.item_id, item.context.name);
            return Ok(false);
        };

        if dry_run {
            tracing::info!("  [DRY RUN] Would re-embed: {} ({})", item.item_id, item.context.name);
            return Ok(false);
        }

        let image = ImageSource::Url(image_url.clone());
        let context = self.extractor.extract(&image).await?;
        tracing::info!("    Extracted: {}", context.name);

        let vector = self.embedder.embed_item(&image, &context).await?;
        tracing::info!("    Embedded: dim={}", vector.len());

        let dimension = vector.len();
        let result = manifest_core::EmbeddingResult {
            item_id: item.item_id,
            vector,
            dimension,
            context,
            image_url: Some(image_url.clone()),
        };

        self.store.delete(item.item_id).await?;
        tracing::info!("    Deleted old row: {}", item.item_id);

        self.store.upsert(&result, &image_url, None).await?;
        tracing::info!("    Inserted new row: {}", item.item_id);

        Ok(true)
    }
}

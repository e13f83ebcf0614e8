//! `manifest-migrate` — offline re-embedding tool for the Manifest vector
//! store. Ported from `reembed_all_items.py`: walk every stored item, re-run
//! extraction and embedding, and write the row back under its original id.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use manifest_core::{
    ClipLocalEmbedder, EmbeddingProvider, ManifestConfig, OpenAiVisionExtractor, SupabaseVectorStore, VoyageEmbedder,
};
use manifest_migrate::{Error, MigrationOptions, Migrator};

/// Re-embed every item in the vector store with the current extraction and
/// embedding providers.
#[derive(Parser, Debug)]
#[command(name = "manifest-migrate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log what would happen without touching the store.
    #[arg(long)]
    dry_run: bool,

    /// Only re-embed items missing the newer context fields.
    #[arg(long)]
    only_missing: bool,

    /// Delay between items, in seconds, to stay under provider rate limits.
    #[arg(long, default_value = "1.0")]
    delay: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = ManifestConfig::from_env().map_err(|e| Error::Config(e.to_string()))?;
    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }

    let openai_key = config.openai_api_key.clone().unwrap_or_default();
    let extractor = Arc::new(OpenAiVisionExtractor::new(openai_key));

    let embedder: Arc<dyn manifest_core::Embedder> = match config.embedding_provider {
        EmbeddingProvider::Voyage => Arc::new(VoyageEmbedder::new(
            config.voyage_api_key.clone().unwrap_or_default(),
            EmbeddingProvider::Voyage.dimension(),
        )),
        EmbeddingProvider::ClipLocal => Arc::new(ClipLocalEmbedder::new()),
    };

    let store = Arc::new(SupabaseVectorStore::new(
        config.supabase_url.clone().unwrap_or_default(),
        config.supabase_service_key.clone().unwrap_or_default(),
    ));

    let migrator = Migrator::new(extractor, embedder, store);
    let options = MigrationOptions {
        dry_run: args.dry_run,
        only_missing: args.only_missing,
        delay: Duration::from_secs_f64(args.delay.max(0.0)),
    };

    let summary = migrator.run(&options).await?;
    if summary.failed > 0 {
        anyhow::bail!("{} of {} items failed to re-embed", summary.failed, summary.total);
    }

    Ok(())
}

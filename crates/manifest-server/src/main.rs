//! Manifest Server — REST API for the AI-assisted inventory search and
//! packing pipeline.

use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use manifest_core::{
    ClipLocalEmbedder, EmbeddingProvider, ManifestConfig, OpenAiSynthesizer, OpenAiVisionExtractor,
    Orchestrator, SupabaseVectorStore, VoyageEmbedder,
};
use manifest_server::{build_router, ApiDoc, AppState};

/// Manifest Server — a thin REST surface over the ingest/search/pack pipeline.
#[derive(Parser, Debug)]
#[command(name = "manifest-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host address to bind to.
    #[arg(long, default_value = "0.0.0.0", env = "MANIFEST_HOST")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, default_value = "8080", env = "MANIFEST_PORT")]
    port: u16,
}

/// Build CORS layer from environment configuration, matching the server's
/// development-permissive / production-restricted split.
fn build_cors_layer() -> CorsLayer {
    match std::env::var("MANIFEST_CORS_ORIGIN") {
        Ok(origins) => {
            use tower_http::cors::AllowOrigin;
            let origin_list: Vec<_> = origins.split(',').filter_map(|o| o.trim().parse().ok()).collect();
            tracing::info!("CORS: restricted to {} origin(s)", origin_list.len());
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origin_list))
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any)
        }
        Err(_) => {
            tracing::warn!("CORS: permissive (dev mode). Set MANIFEST_CORS_ORIGIN to restrict origins.");
            CorsLayer::permissive()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!("Starting Manifest server...");

    let config = ManifestConfig::from_env()?;
    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }

    let openai_key = config.openai_api_key.clone().unwrap_or_default();
    let extractor = Arc::new(OpenAiVisionExtractor::new(openai_key.clone()));
    let synthesizer = Arc::new(OpenAiSynthesizer::new(openai_key));

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

    let orchestrator = Orchestrator::new(
        extractor,
        embedder,
        store,
        synthesizer,
        config.embedding_provider.dimension(),
        config.solver_time_limit_seconds,
    )?;

    if std::env::var("MANIFEST_API_KEY").is_ok() {
        tracing::info!("Authentication: enabled (MANIFEST_API_KEY is set)");
    } else {
        tracing::warn!("Authentication: DISABLED (dev mode). Set MANIFEST_API_KEY to enable.");
    }

    let state = Arc::new(AppState { orchestrator });

    let app = build_router(state)
        .merge(Router::<()>::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Manifest server listening on http://{addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

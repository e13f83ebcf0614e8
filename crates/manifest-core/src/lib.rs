//! Core domain logic for Manifest: an AI-assisted physical-inventory search
//! and packing service.
//!
//! Three subsystems compose into the [`orchestrator::Orchestrator`]:
//! a two-stage ingest pipeline ([`extractor`] + [`embedder`]), a retrieval
//! stage ([`store`] + [`synthesizer`]), and a constrained packing optimizer
//! ([`optimizer`]).

pub mod config;
pub mod embedder;
pub mod error;
pub mod extractor;
pub mod metrics;
pub mod model;
pub mod optimizer;
pub mod orchestrator;
pub mod store;
pub mod synthesizer;

pub use config::{EmbeddingProvider, ManifestConfig};
pub use embedder::{ClipLocalEmbedder, Embedder, VoyageEmbedder};
pub use error::{Error, Result};
pub use extractor::{ContextExtractor, ImageSource, OpenAiVisionExtractor, StaticExtractor};
pub use model::{
    ContainerPackingResult, ContainerSpec, EmbeddingResult, ItemContext, MissionPlan,
    MultiPackingResult, PackableItem, PackingConstraints, PackingResult, PackingStatus,
    RetrievedItem,
};
pub use optimizer::{constraint_preset, retrieved_to_packable, KnapsackOptimizer};
pub use orchestrator::{Orchestrator, SearchOutcome};
pub use store::{InMemoryVectorStore, SupabaseVectorStore, VectorStore};
pub use synthesizer::{MissionSynthesizer, OpenAiSynthesizer, StaticSynthesizer};

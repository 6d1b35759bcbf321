//! Workspace umbrella crate for steerspace.
//!
//! Sentence embeddings are decomposed into sparse-autoencoder features, pushed
//! along chosen feature directions (or blended between two sentences), turned
//! back into text and placed on a 2-D map next to the rest of the corpus.
//!
//! This crate re-exports the member crates' public surface, loads the YAML
//! stack configuration and assembles datasets from on-disk artifacts.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use steerspace::{NoopMetrics, StackConfig, build_registry};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let stack = StackConfig::from_file("stack.yaml")?;
//! let registry = build_registry(&stack, Arc::new(NoopMetrics)).await?;
//! let poems = registry.get("poems")?;
//! println!("{} sentences", poems.len().await);
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;

pub use bootstrap::{BootstrapError, build_context, build_registry, load_dataset};
pub use config::{ConfigLoadError, DatasetConfig, StackConfig};

pub use engine::{
    ActivationSummary, AddOutcome, Capabilities, Capability, Dataset, DatasetRegistry,
    EngineConfig, EngineContext, EngineError, EngineMetrics, EngineResult, FeatureWeight,
    GeneratedPoint, InstructRequest, InterpolateRequest, NoopMetrics, Operation, SteerRequest,
};
pub use features::{
    FeatureActivation, FeatureCatalog, FeatureError, FeatureModel, GatedSparseAutoencoder, Sae,
    SaeLayout, SparseAutoencoder,
};
pub use llm::{LlmClient, LlmConfig, LlmError};
pub use projection::{ProjectedPoint, ProjectionAdapter, ProjectionConfig, ProjectionError};
pub use semantic::{SemanticClient, SemanticConfig, SemanticError};
pub use store::{EmbeddingStore, EntryId, Neighbor, StoreError};

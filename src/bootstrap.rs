//! Turn a [`StackConfig`] into live datasets.
//!
//! Artifacts are read from disk, capability clients are built from their
//! config sections, and each dataset's projector is fitted on its initial
//! store before the dataset is handed out.

use std::sync::Arc;

use engine::{Capabilities, Dataset, DatasetRegistry, EngineContext, EngineError, EngineMetrics};
use features::{
    load_sae_file, load_summaries_file, read_matrix_file, FeatureCatalog, FeatureError,
    FeatureModel,
};
use llm::{LlmClient, LlmError};
use projection::{ProjectionAdapter, ProjectionConfig, ProjectionError};
use semantic::{SemanticClient, SemanticError};
use store::{EmbeddingStore, StoreError};
use thiserror::Error;
use tracing::info;

use crate::config::{DatasetConfig, StackConfig};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("dataset `{dataset}`: {source}")]
    Artifacts {
        dataset: String,
        #[source]
        source: FeatureError,
    },

    #[error("dataset `{dataset}` embeddings: {source}")]
    Embeddings {
        dataset: String,
        #[source]
        source: StoreError,
    },

    #[error("semantic client: {0}")]
    Semantic(#[from] SemanticError),

    #[error("llm client: {0}")]
    Llm(#[from] LlmError),

    #[error("projection: {0}")]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Capability clients plus engine settings, shared by every dataset.
pub fn build_context(
    stack: &StackConfig,
    metrics: Arc<dyn EngineMetrics>,
) -> Result<Arc<EngineContext>, BootstrapError> {
    let semantic = SemanticClient::new(stack.semantic.clone())?;
    let llm = LlmClient::new(stack.llm.clone())?;
    let ctx = EngineContext::new(
        Capabilities::from_clients(semantic, llm),
        stack.engine.clone(),
    )?
    .with_metrics(metrics);
    Ok(Arc::new(ctx))
}

/// Load one dataset's artifacts and fit its projector.
pub async fn load_dataset(
    cfg: &DatasetConfig,
    projection: &ProjectionConfig,
    ctx: Arc<EngineContext>,
) -> Result<Dataset, BootstrapError> {
    let artifacts = |source| BootstrapError::Artifacts {
        dataset: cfg.name.clone(),
        source,
    };

    let sae = load_sae_file(&cfg.sae_path, cfg.sae_layout).map_err(artifacts)?;
    let directions = match &cfg.features_path {
        Some(path) => read_matrix_file(path, &cfg.features_tensor).map_err(artifacts)?,
        None => sae.decoder().to_owned(),
    };
    let summaries = match &cfg.summaries_path {
        Some(path) => load_summaries_file(path, sae.n_features()).map_err(artifacts)?,
        None => vec![String::new(); sae.n_features()],
    };
    let catalog = FeatureCatalog::new(directions, summaries).map_err(artifacts)?;

    let embeddings =
        read_matrix_file(&cfg.embeddings_path, &cfg.embeddings_tensor).map_err(artifacts)?;
    let store =
        EmbeddingStore::from_matrix(embeddings).map_err(|source| BootstrapError::Embeddings {
            dataset: cfg.name.clone(),
            source,
        })?;

    let projector = ProjectionAdapter::from_config(projection)?;
    let dataset = Dataset::new(cfg.name.clone(), Arc::new(sae), catalog, store, projector, ctx)?;
    if !dataset.is_empty().await {
        dataset.refit_projection().await?;
    }
    Ok(dataset)
}

/// Every dataset in `stack`, ready to serve.
pub async fn build_registry(
    stack: &StackConfig,
    metrics: Arc<dyn EngineMetrics>,
) -> Result<DatasetRegistry, BootstrapError> {
    let ctx = build_context(stack, metrics)?;
    let mut registry = DatasetRegistry::new();
    for cfg in &stack.datasets {
        let dataset = load_dataset(cfg, &stack.projection, ctx.clone()).await?;
        registry.insert(dataset)?;
    }
    info!(datasets = ?registry.names(), "stack ready");
    Ok(registry)
}

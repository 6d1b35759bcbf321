//! One dataset: its feature model and catalog, its growing embedding store and
//! the projector that places store entries in the plane.
//!
//! Store and projector sit behind a single async lock. Capability calls that
//! only read (embedding a sentence, inverting, asking the llm) run outside the
//! lock; every store mutation and the projection that goes with it run inside
//! it, so mutations are serialized per dataset and nobody observes a store
//! whose similarity matrix is mid-rebuild.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use ndarray::{Array1, Array2, ArrayView2};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use features::{FeatureCatalog, FeatureModel};
use projection::{ProjectedPoint, ProjectionAdapter};
use store::EmbeddingStore;

use crate::context::EngineContext;
use crate::metrics::Operation;
use crate::prompt_cache::PromptCache;
use crate::types::{AddOutcome, GeneratedPoint};
use crate::{Capability, EngineError, EngineResult};

pub(crate) struct DatasetState {
    pub(crate) store: EmbeddingStore,
    pub(crate) projector: ProjectionAdapter,
}

/// A dataset served by the engine.
pub struct Dataset {
    name: String,
    model: Arc<dyn FeatureModel>,
    catalog: FeatureCatalog,
    state: Mutex<DatasetState>,
    prompt_cache: PromptCache,
    rng: StdMutex<fastrand::Rng>,
    ctx: Arc<EngineContext>,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("name", &self.name)
            .field("features", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

impl Dataset {
    /// Assemble a dataset, checking that model, catalog and store agree on shape.
    pub fn new(
        name: impl Into<String>,
        model: Arc<dyn FeatureModel>,
        catalog: FeatureCatalog,
        store: EmbeddingStore,
        projector: ProjectionAdapter,
        ctx: Arc<EngineContext>,
    ) -> EngineResult<Self> {
        let name = name.into();
        let invalid = |reason: String| EngineError::InvalidDataset {
            name: name.clone(),
            reason,
        };
        if model.n_features() != catalog.len() {
            return Err(invalid(format!(
                "model has {} features but the catalog has {}",
                model.n_features(),
                catalog.len()
            )));
        }
        if model.n_inputs() != catalog.dim() || store.dim() != catalog.dim() {
            return Err(invalid(format!(
                "dimension disagreement: model {}, catalog {}, store {}",
                model.n_inputs(),
                catalog.dim(),
                store.dim()
            )));
        }
        let cfg = ctx.config();
        let pool = (catalog.len().saturating_sub(1) as f64 * cfg.similar_top_percent).floor() as usize;
        if !catalog.is_empty() && pool < cfg.similar_per_feature {
            return Err(invalid(format!(
                "similar_top_percent {} leaves {pool} candidates per feature, fewer than similar_per_feature {}",
                cfg.similar_top_percent, cfg.similar_per_feature
            )));
        }

        let rng = match cfg.sampling_seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        info!(
            dataset = %name,
            entries = store.len(),
            features = catalog.len(),
            dim = catalog.dim(),
            "dataset loaded"
        );
        Ok(Self {
            prompt_cache: PromptCache::new(cfg.prompt_cache_capacity),
            rng: StdMutex::new(rng),
            name,
            model,
            catalog,
            state: Mutex::new(DatasetState { store, projector }),
            ctx,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    pub(crate) fn model(&self) -> &dyn FeatureModel {
        self.model.as_ref()
    }

    pub(crate) fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub(crate) fn with_rng<T>(&self, f: impl FnOnce(&mut fastrand::Rng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    pub(crate) async fn lock_state(&self) -> tokio::sync::MutexGuard<'_, DatasetState> {
        self.state.lock().await
    }

    /// Number of stored sentences.
    pub async fn len(&self) -> usize {
        self.state.lock().await.store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_projected(&self) -> bool {
        self.state.lock().await.projector.is_fitted()
    }

    /// Stored embedding at `index`, else a fresh embedding of `sentence`.
    pub(crate) async fn resolve_embedding(&self, sentence: &str, index: i64) -> EngineResult<Array1<f32>> {
        {
            let state = self.state.lock().await;
            if let Some(row) = state.store.lookup(index) {
                return Ok(row.to_owned());
            }
        }
        if sentence.trim().is_empty() {
            return Err(EngineError::invalid(format!(
                "index {index} is not stored and no sentence was given"
            )));
        }
        debug!(dataset = %self.name, index, "index not stored, embedding sentence");
        let mut vectors = self.ctx.embed(&self.name, &[sentence.to_string()]).await?;
        let vector = vectors.pop().unwrap_or_default();
        self.check_embedding_dim(vector.len())?;
        Ok(Array1::from(vector))
    }

    fn check_embedding_dim(&self, actual: usize) -> EngineResult<()> {
        let expected = self.catalog.dim();
        if actual != expected {
            return Err(EngineError::capability(
                Capability::Embed,
                format!("returned {actual}-dimensional embeddings, dataset expects {expected}"),
            ));
        }
        Ok(())
    }

    async fn embed_rows(&self, sentences: &[String]) -> EngineResult<Array2<f32>> {
        let vectors = self.ctx.embed(&self.name, sentences).await?;
        let dim = self.catalog.dim();
        let mut flat = Vec::with_capacity(vectors.len() * dim);
        for v in &vectors {
            self.check_embedding_dim(v.len())?;
            flat.extend_from_slice(v);
        }
        Array2::from_shape_vec((vectors.len(), dim), flat)
            .map_err(|e| EngineError::capability(Capability::Embed, e))
    }

    /// Embed `sentences`, append them to the store and place them in the plane.
    ///
    /// `weights`, when given, is zipped onto the points in order.
    pub(crate) async fn embed_and_place(
        &self,
        sentences: Vec<String>,
        weights: Option<&[f64]>,
        operation: Operation,
        requested: usize,
    ) -> EngineResult<Vec<GeneratedPoint>> {
        if sentences.len() < requested {
            warn!(
                dataset = %self.name,
                operation = operation.as_str(),
                requested,
                produced = sentences.len(),
                "fewer sentences than requested"
            );
        }
        self.ctx
            .metrics()
            .record_points(&self.name, operation, requested, sentences.len());
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.embed_rows(&sentences).await?;
        let positions = {
            let mut state = self.state.lock().await;
            self.append_and_project(&mut state, rows.view()).await?
        };

        Ok(sentences
            .into_iter()
            .zip(positions)
            .enumerate()
            .map(|(i, (sentence, position))| {
                let weight = weights.and_then(|w| w.get(i).copied());
                GeneratedPoint::new(sentence, position, weight)
            })
            .collect())
    }

    /// Add `rows` to the store and return their positions.
    ///
    /// With a fitted projector the rows are placed first and appended only if
    /// placement succeeds. Without one the projector is fitted on the grown
    /// store, and the rows are taken back out if that fit fails.
    async fn append_and_project(
        &self,
        state: &mut DatasetState,
        rows: ArrayView2<'_, f32>,
    ) -> EngineResult<Vec<ProjectedPoint>> {
        let positions = if state.projector.is_fitted() {
            let positions = self
                .ctx
                .call(&self.name, Capability::Project, state.projector.project(rows))
                .await?;
            state.store.add_many(rows)?;
            positions
        } else {
            let before = state.store.len();
            state.store.add_many(rows)?;
            let fitted = self
                .ctx
                .call(
                    &self.name,
                    Capability::Project,
                    state.projector.refit_all(&state.store),
                )
                .await;
            match fitted {
                Ok(all) => all[before..].to_vec(),
                Err(err) => {
                    while state.store.len() > before {
                        state.store.remove(before)?;
                    }
                    return Err(err);
                }
            }
        };
        self.stored(state.store.len());
        Ok(positions)
    }

    fn stored(&self, entries: usize) {
        self.ctx.metrics().record_store_size(&self.name, entries);
        info!(dataset = %self.name, entries, "store updated");
    }

    fn require_sentence(sentence: &str, field: &str) -> EngineResult<()> {
        if sentence.trim().is_empty() {
            return Err(EngineError::invalid(format!("{field} must not be empty")));
        }
        Ok(())
    }

    /// Embed one sentence, store it and place it.
    pub async fn add_sentence(&self, sentence: &str) -> EngineResult<Vec<GeneratedPoint>> {
        Self::require_sentence(sentence, "sentence")?;
        self.embed_and_place(vec![sentence.to_string()], None, Operation::AddSentence, 1)
            .await
    }

    /// Append `sentences` unless the store already holds `total_sentences` or more.
    ///
    /// Runs under the dataset lock from the size check to the append so two
    /// concurrent calls cannot both decide to add.
    pub async fn add_sentences(
        &self,
        sentences: &[String],
        total_sentences: usize,
    ) -> EngineResult<AddOutcome> {
        let mut state = self.state.lock().await;
        let existing = state.store.len();
        if existing >= total_sentences {
            debug!(dataset = %self.name, existing, total_sentences, "no sentences to add");
            return Ok(AddOutcome::Skipped { entries: existing });
        }
        if sentences.is_empty() {
            return Err(EngineError::invalid("sentences must not be empty"));
        }
        let rows = self.embed_rows(sentences).await?;
        state.store.add_many(rows.view())?;
        let entries = state.store.len();
        self.stored(entries);
        Ok(AddOutcome::Added {
            added: sentences.len(),
            entries,
        })
    }

    /// Re-embed the sentence at `index` with new text and place it again.
    pub async fn edit_sentence(&self, index: usize, sentence: &str) -> EngineResult<Vec<GeneratedPoint>> {
        Self::require_sentence(sentence, "new_sentence")?;
        self.check_index(index).await?;
        let rows = self.embed_rows(&[sentence.to_string()]).await?;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        // the store may have shrunk while we were embedding
        let len = state.store.len();
        if index >= len {
            return Err(EngineError::invalid(format!(
                "index {index} out of range for {len} sentences"
            )));
        }
        let position = if state.projector.is_fitted() {
            let position = self
                .ctx
                .call(
                    &self.name,
                    Capability::Project,
                    state.projector.project_one(rows.row(0)),
                )
                .await?;
            state.store.replace(index, rows.row(0))?;
            position
        } else {
            // the fit needs the new row in place; put the old one back if it fails
            let previous = state.store.embeddings().row(index).to_owned();
            state.store.replace(index, rows.row(0))?;
            let fitted = self
                .ctx
                .call(
                    &self.name,
                    Capability::Project,
                    state.projector.refit_all(&state.store),
                )
                .await;
            match fitted {
                Ok(all) => all[index],
                Err(err) => {
                    state.store.replace(index, previous.view())?;
                    return Err(err);
                }
            }
        };
        self.stored(state.store.len());
        self.ctx
            .metrics()
            .record_points(&self.name, Operation::EditSentence, 1, 1);
        Ok(vec![GeneratedPoint::new(sentence.to_string(), position, None)])
    }

    /// Remove the sentence at `index`; later indices shift down by one.
    pub async fn remove_sentence(&self, index: usize) -> EngineResult<usize> {
        let mut state = self.state.lock().await;
        let len = state.store.len();
        if index >= len {
            return Err(EngineError::invalid(format!(
                "index {index} out of range for {len} sentences"
            )));
        }
        let id = state.store.remove(index)?;
        let entries = state.store.len();
        debug!(dataset = %self.name, index, id = %id, "sentence removed");
        self.stored(entries);
        Ok(entries)
    }

    /// Fit a fresh projector on the whole store; one point per stored sentence.
    pub async fn refit_projection(&self) -> EngineResult<Vec<ProjectedPoint>> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if state.store.is_empty() {
            return Err(EngineError::invalid("cannot fit a projection on an empty dataset"));
        }
        self.ctx
            .call(
                &self.name,
                Capability::Project,
                state.projector.refit_all(&state.store),
            )
            .await
    }

    /// Prompt ideas for `sentence`, served from the cache when the exact text was seen before.
    pub async fn prompt_ideas(&self, sentence: &str) -> EngineResult<Vec<String>> {
        Self::require_sentence(sentence, "sentence")?;
        if let Some(ideas) = self.prompt_cache.get(sentence) {
            debug!(dataset = %self.name, "prompt ideas served from cache");
            return Ok(ideas);
        }
        let count = self.ctx.config().prompt_idea_count;
        let ideas = self
            .ctx
            .call(
                &self.name,
                Capability::Llm,
                self.ctx.capabilities().llm.prompt_ideas(sentence, count),
            )
            .await?;
        self.prompt_cache.insert(sentence, ideas.clone());
        Ok(ideas)
    }

    async fn check_index(&self, index: usize) -> EngineResult<()> {
        let len = self.len().await;
        if index >= len {
            return Err(EngineError::invalid(format!(
                "index {index} out of range for {len} sentences"
            )));
        }
        Ok(())
    }
}

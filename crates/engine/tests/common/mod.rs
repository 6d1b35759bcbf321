#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use engine::capabilities::{CapabilityResult, Embedder, Inverter, LanguageModel};
use engine::{
    Capabilities, Capability, Dataset, EngineConfig, EngineContext, EngineMetrics, EngineResult,
    Operation,
};
use features::{FeatureCatalog, SparseAutoencoder};
use ndarray::{Array1, Array2, ArrayView2};
use projection::{PcaReducer, ProjectionAdapter, ProjectionError, ProjectionResult, Reducer};
use store::EmbeddingStore;

pub const DIM: usize = 4;
pub const FEATURES: usize = 8;

/// Counts every capability call and records what the inverter and llm saw.
#[derive(Default)]
pub struct Fakes {
    pub embed_calls: AtomicUsize,
    pub invert_calls: AtomicUsize,
    pub llm_calls: AtomicUsize,
    pub inverted: Mutex<Vec<Vec<f32>>>,
    pub corrections: Mutex<Vec<(String, String)>>,
    /// Cap on how many variations `vary` returns.
    pub vary_limit: Mutex<Option<usize>>,
    /// Cap on how many sentences `correct_batch` returns.
    pub batch_limit: Mutex<Option<usize>>,
}

impl Fakes {
    pub fn total_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
            + self.invert_calls.load(Ordering::SeqCst)
            + self.llm_calls.load(Ordering::SeqCst)
    }
}

/// Deterministic 4-d embedding from a sentence's bytes.
pub fn fake_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.1f32; DIM];
    for (i, b) in text.bytes().enumerate() {
        v[i % DIM] += f32::from(b) / 255.0;
    }
    v
}

#[async_trait]
impl Embedder for Fakes {
    async fn embed_batch(&self, texts: &[String]) -> CapabilityResult<Vec<Vec<f32>>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| fake_embedding(t)).collect())
    }
}

#[async_trait]
impl Inverter for Fakes {
    async fn invert_batch(&self, embeddings: &[Vec<f32>]) -> CapabilityResult<Vec<String>> {
        self.invert_calls.fetch_add(1, Ordering::SeqCst);
        self.inverted
            .lock()
            .unwrap()
            .extend(embeddings.iter().cloned());
        Ok((0..embeddings.len()).map(|i| format!("draft {i}")).collect())
    }
}

#[async_trait]
impl LanguageModel for Fakes {
    async fn correct(&self, draft: &str, example: &str) -> CapabilityResult<String> {
        self.llm_calls.fetch_add(1, Ordering::SeqCst);
        self.corrections
            .lock()
            .unwrap()
            .push((draft.to_string(), example.to_string()));
        Ok(format!("Corrected {draft}."))
    }

    async fn vary(
        &self,
        sentence: &str,
        count: usize,
        instruction: Option<&str>,
    ) -> CapabilityResult<Vec<String>> {
        self.llm_calls.fetch_add(1, Ordering::SeqCst);
        let n = self.vary_limit.lock().unwrap().map_or(count, |l| l.min(count));
        let tag = instruction.unwrap_or("plain");
        Ok((0..n).map(|i| format!("{sentence} ({tag} {i})")).collect())
    }

    async fn correct_batch(
        &self,
        drafts: &[String],
        anchor_a: &str,
        anchor_b: &str,
    ) -> CapabilityResult<Vec<String>> {
        self.llm_calls.fetch_add(1, Ordering::SeqCst);
        let n = self
            .batch_limit
            .lock()
            .unwrap()
            .map_or(drafts.len(), |l| l.min(drafts.len()));
        Ok(drafts[..n]
            .iter()
            .map(|d| format!("{d} between {anchor_a} and {anchor_b}"))
            .collect())
    }

    async fn prompt_ideas(&self, sentence: &str, count: usize) -> CapabilityResult<Vec<String>> {
        self.llm_calls.fetch_add(1, Ordering::SeqCst);
        Ok((0..count).map(|i| format!("idea {i} for {sentence}")).collect())
    }
}

#[derive(Default)]
pub struct RecordingMetrics {
    pub points: Mutex<Vec<(Operation, usize, usize)>>,
    pub failures: Mutex<Vec<Capability>>,
    pub sizes: Mutex<Vec<usize>>,
}

impl EngineMetrics for RecordingMetrics {
    fn record_capability(&self, _: &str, capability: Capability, _: Duration, ok: bool) {
        if !ok {
            self.failures.lock().unwrap().push(capability);
        }
    }

    fn record_points(&self, _: &str, operation: Operation, requested: usize, produced: usize) {
        self.points
            .lock()
            .unwrap()
            .push((operation, requested, produced));
    }

    fn record_store_size(&self, _: &str, entries: usize) {
        self.sizes.lock().unwrap().push(entries);
    }
}

/// Reducer whose every fit and transform fails.
pub struct BrokenReducer {
    pub fitted: bool,
}

impl BrokenReducer {
    pub fn adapter(fitted: bool) -> ProjectionAdapter {
        ProjectionAdapter::new(Box::new(BrokenReducer { fitted }))
    }
}

#[async_trait]
impl Reducer for BrokenReducer {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    async fn fit(&mut self, _: ArrayView2<'_, f32>) -> ProjectionResult<Array2<f32>> {
        Err(ProjectionError::Http("projection service down".into()))
    }

    async fn transform(&self, _: ArrayView2<'_, f32>) -> ProjectionResult<Array2<f32>> {
        Err(ProjectionError::Http("projection service down".into()))
    }

    fn fresh(&self) -> Box<dyn Reducer> {
        Box::new(BrokenReducer {
            fitted: self.fitted,
        })
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        max_gen_num: 10,
        top_feature_count: 2,
        similar_per_feature: 2,
        similar_top_percent: 0.5,
        neighbor_count: 2,
        prompt_idea_count: 3,
        sampling_seed: Some(7),
        ..Default::default()
    }
}

/// Encoder that reads each input coordinate twice, decoder that is its transpose.
fn model() -> SparseAutoencoder {
    let mut w_enc = Array2::<f32>::zeros((DIM, FEATURES));
    for f in 0..FEATURES {
        w_enc[[f % DIM, f]] = 1.0;
    }
    SparseAutoencoder::from_parts(
        w_enc.clone(),
        Array1::zeros(FEATURES),
        w_enc.t().to_owned(),
        Array1::zeros(DIM),
    )
    .unwrap()
}

pub fn seed_store() -> EmbeddingStore {
    let rows: Vec<f32> = ["a calm sea", "a stormy night", "the old lighthouse"]
        .iter()
        .flat_map(|s| fake_embedding(s))
        .collect();
    EmbeddingStore::from_matrix(Array2::from_shape_vec((3, DIM), rows).unwrap()).unwrap()
}

pub struct Harness {
    pub fakes: Arc<Fakes>,
    pub metrics: Arc<RecordingMetrics>,
    pub dataset: Dataset,
}

pub fn try_harness_with(config: EngineConfig, projector: ProjectionAdapter) -> EngineResult<Harness> {
    let fakes = Arc::new(Fakes::default());
    let metrics = Arc::new(RecordingMetrics::default());
    let caps = Capabilities::new(fakes.clone(), fakes.clone(), fakes.clone());
    let ctx = EngineContext::new(caps, config)?.with_metrics(metrics.clone());
    let sae = model();
    let summaries = (0..FEATURES).map(|f| format!("feature {f}")).collect();
    let catalog = FeatureCatalog::from_decoder(sae.decoder(), summaries)?;
    let dataset = Dataset::new(
        "demo",
        Arc::new(sae),
        catalog,
        seed_store(),
        projector,
        Arc::new(ctx),
    )?;
    Ok(Harness {
        fakes,
        metrics,
        dataset,
    })
}

pub fn harness_with(config: EngineConfig, projector: ProjectionAdapter) -> Harness {
    match try_harness_with(config, projector) {
        Ok(h) => h,
        Err(err) => panic!("dataset rejected: {err}"),
    }
}

pub fn pca() -> ProjectionAdapter {
    ProjectionAdapter::new(Box::new(PcaReducer::new(2)))
}

/// Dataset with an unfitted local projector.
pub fn harness() -> Harness {
    harness_with(test_config(), pca())
}

/// Dataset whose projector has been fitted on the seed store.
pub async fn fitted_harness() -> Harness {
    let h = harness();
    h.dataset.refit_projection().await.unwrap();
    h
}

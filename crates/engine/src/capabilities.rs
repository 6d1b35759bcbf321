//! Interfaces to the services the engine calls but does not implement.
//!
//! Each trait is object safe so datasets can share `Arc<dyn ...>` handles.
//! Implementations for the HTTP clients in `semantic` and `llm` live here too.

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;

use llm::LlmClient;
use semantic::SemanticClient;

/// Error type capability implementations report with.
pub type BoxError = Box<dyn Error + Send + Sync>;

pub type CapabilityResult<T> = Result<T, BoxError>;

/// Sentence to embedding, one vector per input, in order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> CapabilityResult<Vec<Vec<f32>>>;
}

/// Embedding to sentence, one sentence per input, in order.
#[async_trait]
pub trait Inverter: Send + Sync {
    async fn invert_batch(&self, embeddings: &[Vec<f32>]) -> CapabilityResult<Vec<String>>;
}

/// Text generation and repair.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// A grammatical rewrite of `draft` modeled on `example`.
    async fn correct(&self, draft: &str, example: &str) -> CapabilityResult<String>;

    /// Up to `count` distinct variations of `sentence`, optionally guided by `instruction`.
    async fn vary(
        &self,
        sentence: &str,
        count: usize,
        instruction: Option<&str>,
    ) -> CapabilityResult<Vec<String>>;

    /// Repair an ordered interpolation path between `anchor_a` and `anchor_b`.
    async fn correct_batch(
        &self,
        drafts: &[String],
        anchor_a: &str,
        anchor_b: &str,
    ) -> CapabilityResult<Vec<String>>;

    async fn prompt_ideas(&self, sentence: &str, count: usize) -> CapabilityResult<Vec<String>>;
}

/// The capability handles shared by every dataset.
#[derive(Clone)]
pub struct Capabilities {
    pub embedder: Arc<dyn Embedder>,
    pub inverter: Arc<dyn Inverter>,
    pub llm: Arc<dyn LanguageModel>,
}

impl Capabilities {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        inverter: Arc<dyn Inverter>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            embedder,
            inverter,
            llm,
        }
    }

    /// Embedding and inversion from one semantic client, generation from one llm client.
    pub fn from_clients(semantic: SemanticClient, llm: LlmClient) -> Self {
        let semantic = Arc::new(semantic);
        Self::new(semantic.clone(), semantic, Arc::new(llm))
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

#[async_trait]
impl Embedder for SemanticClient {
    async fn embed_batch(&self, texts: &[String]) -> CapabilityResult<Vec<Vec<f32>>> {
        Ok(SemanticClient::embed_batch(self, texts).await?)
    }
}

#[async_trait]
impl Inverter for SemanticClient {
    async fn invert_batch(&self, embeddings: &[Vec<f32>]) -> CapabilityResult<Vec<String>> {
        Ok(SemanticClient::invert_batch(self, embeddings).await?)
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn correct(&self, draft: &str, example: &str) -> CapabilityResult<String> {
        Ok(LlmClient::correct(self, draft, example).await?)
    }

    async fn vary(
        &self,
        sentence: &str,
        count: usize,
        instruction: Option<&str>,
    ) -> CapabilityResult<Vec<String>> {
        Ok(LlmClient::vary(self, sentence, count, instruction).await?)
    }

    async fn correct_batch(
        &self,
        drafts: &[String],
        anchor_a: &str,
        anchor_b: &str,
    ) -> CapabilityResult<Vec<String>> {
        Ok(LlmClient::correct_batch(self, drafts, anchor_a, anchor_b).await?)
    }

    async fn prompt_ideas(&self, sentence: &str, count: usize) -> CapabilityResult<Vec<String>> {
        Ok(LlmClient::prompt_ideas(self, sentence, count).await?)
    }
}

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::capabilities::{BoxError, Capabilities};
use crate::metrics::{EngineMetrics, NoopMetrics};
use crate::{Capability, EngineConfig, EngineError, EngineResult};

/// Everything a dataset needs besides its own artifacts.
///
/// Built once during startup and shared by every dataset in a registry.
pub struct EngineContext {
    capabilities: Capabilities,
    config: EngineConfig,
    metrics: Arc<dyn EngineMetrics>,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EngineContext {
    pub fn new(capabilities: Capabilities, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            capabilities,
            config,
            metrics: Arc::new(NoopMetrics),
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn EngineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn metrics(&self) -> &dyn EngineMetrics {
        self.metrics.as_ref()
    }

    /// Run one capability call under the configured timeout, recording its outcome.
    pub(crate) async fn call<T, E, F>(
        &self,
        dataset: &str,
        capability: Capability,
        fut: F,
    ) -> EngineResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        let after = self.config.capability_timeout();
        let started = Instant::now();
        let outcome = tokio::time::timeout(after, fut).await;
        let elapsed = started.elapsed();

        let result = match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                let err: BoxError = err.into();
                warn!(dataset, capability = %capability, error = %err, "capability call failed");
                Err(EngineError::capability(capability, err))
            }
            Err(_) => {
                warn!(dataset, capability = %capability, timeout_s = after.as_secs(), "capability call timed out");
                Err(EngineError::Timeout { capability, after })
            }
        };
        self.metrics
            .record_capability(dataset, capability, elapsed, result.is_ok());
        debug!(
            dataset,
            capability = %capability,
            elapsed_ms = elapsed.as_millis() as u64,
            ok = result.is_ok(),
            "capability call finished"
        );
        result
    }

    pub(crate) async fn embed(&self, dataset: &str, texts: &[String]) -> EngineResult<Vec<Vec<f32>>> {
        let vectors = self
            .call(dataset, Capability::Embed, self.capabilities.embedder.embed_batch(texts))
            .await?;
        if vectors.len() != texts.len() {
            return Err(EngineError::capability(
                Capability::Embed,
                format!("returned {} vectors for {} sentences", vectors.len(), texts.len()),
            ));
        }
        Ok(vectors)
    }

    pub(crate) async fn invert(&self, dataset: &str, embeddings: &[Vec<f32>]) -> EngineResult<Vec<String>> {
        let sentences = self
            .call(
                dataset,
                Capability::Invert,
                self.capabilities.inverter.invert_batch(embeddings),
            )
            .await?;
        if sentences.len() != embeddings.len() {
            return Err(EngineError::capability(
                Capability::Invert,
                format!(
                    "returned {} sentences for {} embeddings",
                    sentences.len(),
                    embeddings.len()
                ),
            ));
        }
        Ok(sentences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{CapabilityResult, Embedder, Inverter, LanguageModel};
    use async_trait::async_trait;
    use std::time::Duration;

    struct Slow;

    #[async_trait]
    impl Embedder for Slow {
        async fn embed_batch(&self, _: &[String]) -> CapabilityResult<Vec<Vec<f32>>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl Inverter for Slow {
        async fn invert_batch(&self, _: &[Vec<f32>]) -> CapabilityResult<Vec<String>> {
            Err("inverter offline".into())
        }
    }

    #[async_trait]
    impl LanguageModel for Slow {
        async fn correct(&self, draft: &str, _: &str) -> CapabilityResult<String> {
            Ok(draft.to_string())
        }
        async fn vary(&self, _: &str, _: usize, _: Option<&str>) -> CapabilityResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn correct_batch(&self, d: &[String], _: &str, _: &str) -> CapabilityResult<Vec<String>> {
            Ok(d.to_vec())
        }
        async fn prompt_ideas(&self, _: &str, _: usize) -> CapabilityResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn context() -> EngineContext {
        let slow = Arc::new(Slow);
        EngineContext::new(
            Capabilities::new(slow.clone(), slow.clone(), slow),
            EngineConfig {
                capability_timeout_secs: 1,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn slow_capability_times_out() {
        let err = context().embed("demo", &["x".into()]).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Timeout {
                capability: Capability::Embed,
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn failures_name_the_capability() {
        let err = context().invert("demo", &[vec![1.0]]).await.unwrap_err();
        assert_eq!(err.to_string(), "invert capability failed: inverter offline");
    }
}

//! Walk between two sentences in embedding space.

use tracing::debug;

use crate::dataset::Dataset;
use crate::metrics::Operation;
use crate::types::{GeneratedPoint, InterpolateRequest};
use crate::vector::{interpolation_weights, lerp_normalized};
use crate::{Capability, EngineError, EngineResult};

impl Dataset {
    /// `gen_num` sentences between A and B, at weights `k / (gen_num + 1)`.
    ///
    /// Each returned point carries the weight it was generated at. All drafts
    /// are inverted in one batch and corrected in one llm call that sees both
    /// endpoints.
    pub async fn interpolate(&self, request: &InterpolateRequest) -> EngineResult<Vec<GeneratedPoint>> {
        self.check_gen_num(request.gen_num)?;
        if request.sentence_a.trim().is_empty() || request.sentence_b.trim().is_empty() {
            return Err(EngineError::invalid("both endpoint sentences are required"));
        }
        let ctx = self.context();

        let a = self
            .resolve_embedding(&request.sentence_a, request.index_a)
            .await?;
        let b = self
            .resolve_embedding(&request.sentence_b, request.index_b)
            .await?;

        let weights = interpolation_weights(request.gen_num);
        let mixed: Vec<Vec<f32>> = weights
            .iter()
            .map(|&w| lerp_normalized(a.view(), b.view(), w).to_vec())
            .collect();

        let drafts = ctx.invert(self.name(), &mixed).await?;
        debug!(dataset = self.name(), drafts = drafts.len(), "interpolated embeddings inverted");

        let mut sentences = ctx
            .call(
                self.name(),
                Capability::Llm,
                ctx.capabilities().llm.correct_batch(
                    &drafts,
                    &request.sentence_a,
                    &request.sentence_b,
                ),
            )
            .await?;
        sentences.truncate(request.gen_num);

        self.embed_and_place(
            sentences,
            Some(&weights),
            Operation::Interpolate,
            request.gen_num,
        )
        .await
    }
}

//! Feature steering and instruction-driven variation.
//!
//! Steering pushes an embedding along catalog directions, inverts the result
//! back to text, lets the llm repair the inverted draft against the original
//! sentence, and widens one corrected sentence into `gen_num` variations.

use tracing::{debug, warn};

use crate::dataset::Dataset;
use crate::metrics::Operation;
use crate::types::{GeneratedPoint, InstructRequest, SteerRequest};
use crate::vector::compose_steered;
use crate::{Capability, EngineError, EngineResult};

impl Dataset {
    pub(crate) fn check_gen_num(&self, gen_num: usize) -> EngineResult<()> {
        let max = self.context().config().max_gen_num;
        if gen_num == 0 || gen_num > max {
            return Err(EngineError::invalid(format!(
                "gen_num must be between 1 and {max}, got {gen_num}"
            )));
        }
        Ok(())
    }

    fn check_steer(&self, request: &SteerRequest) -> EngineResult<()> {
        self.check_gen_num(request.gen_num)?;
        for term in &request.features {
            self.catalog().check_feature(term.id)?;
            if !term.weight.is_finite() {
                return Err(EngineError::invalid(format!(
                    "weight for feature {} is not finite",
                    term.id
                )));
            }
        }
        Ok(())
    }

    /// Generate `gen_num` sentences steered along `request.features` and place them.
    ///
    /// Fails before any capability call when a feature id is unknown, a weight
    /// is not finite, or `gen_num` is out of range. When the llm returns fewer
    /// variations than asked the shorter list is returned. An empty feature
    /// list inverts the normalized base embedding unchanged.
    pub async fn steer(&self, request: &SteerRequest) -> EngineResult<Vec<GeneratedPoint>> {
        self.check_steer(request)?;
        let ctx = self.context();

        let base = self.resolve_embedding(&request.sentence, request.index).await?;
        let steered = compose_steered(base.view(), self.catalog(), &request.features)?;

        let draft = ctx
            .invert(self.name(), &[steered.to_vec()])
            .await?
            .pop()
            .unwrap_or_default();
        debug!(dataset = self.name(), draft = %draft, "steered embedding inverted");

        let llm = &ctx.capabilities().llm;
        let corrected = ctx
            .call(
                self.name(),
                Capability::Llm,
                llm.correct(&draft, &request.sentence),
            )
            .await?;

        let mut sentences = vec![corrected];
        if request.gen_num > 1 {
            let variations = ctx
                .call(
                    self.name(),
                    Capability::Llm,
                    llm.vary(&sentences[0], request.gen_num - 1, None),
                )
                .await?;
            sentences.extend(variations);
        }
        sentences.truncate(request.gen_num);

        self.embed_and_place(sentences, None, Operation::Steer, request.gen_num)
            .await
    }

    /// Generate `gen_num` rewrites of `request.sentence` following `request.instruction`.
    pub async fn instruct(&self, request: &InstructRequest) -> EngineResult<Vec<GeneratedPoint>> {
        self.check_gen_num(request.gen_num)?;
        if request.sentence.trim().is_empty() {
            return Err(EngineError::invalid("sentence must not be empty"));
        }
        if request.instruction.trim().is_empty() {
            return Err(EngineError::invalid("prompt must not be empty"));
        }
        let ctx = self.context();

        let mut sentences = ctx
            .call(
                self.name(),
                Capability::Llm,
                ctx.capabilities().llm.vary(
                    &request.sentence,
                    request.gen_num,
                    Some(&request.instruction),
                ),
            )
            .await?;
        if sentences.len() > request.gen_num {
            warn!(
                dataset = self.name(),
                requested = request.gen_num,
                returned = sentences.len(),
                "llm returned extra variations, truncating"
            );
            sentences.truncate(request.gen_num);
        }

        self.embed_and_place(sentences, None, Operation::Instruct, request.gen_num)
            .await
    }
}

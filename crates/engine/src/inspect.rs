use features::inspect_activations;
use ndarray::Array1;

use crate::dataset::Dataset;
use crate::types::ActivationSummary;
use crate::EngineResult;

impl Dataset {
    /// Feature activations of the sentence at `index` (or of `sentence`, embedded
    /// on the spot) with its nearest stored neighbors and related features.
    ///
    /// Neighbors are only reported for stored sentences.
    pub async fn top_activations(&self, sentence: &str, index: i64) -> EngineResult<ActivationSummary> {
        let stored: Option<(Array1<f32>, Vec<usize>)> = {
            let state = self.lock_state().await;
            match usize::try_from(index).ok().filter(|&i| i < state.store.len()) {
                Some(i) => {
                    let neighbors = state
                        .store
                        .nearest_neighbors(i, self.context().config().neighbor_count)?
                        .into_iter()
                        .map(|n| n.index)
                        .collect();
                    state.store.get(i).map(|row| (row.to_owned(), neighbors))
                }
                None => None,
            }
        };

        let (embedding, neighbors) = match stored {
            Some(found) => found,
            None => (self.resolve_embedding(sentence, index).await?, Vec::new()),
        };

        let options = self.context().config().inspect_options();
        let report = self.with_rng(|rng| {
            inspect_activations(self.model(), self.catalog(), embedding.view(), &options, rng)
        })?;

        Ok(ActivationSummary {
            top_features: report.top_features,
            neighbors,
            similar_features: report.similar_features,
        })
    }
}

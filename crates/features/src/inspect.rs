use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use store::similarity::rank_descending;
use tracing::debug;

use crate::catalog::FeatureCatalog;
use crate::error::{FeatureError, FeatureResult};
use crate::model::FeatureModel;

/// One feature with its activation on the inspected embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureActivation {
    pub feature: usize,
    pub summary: String,
    pub activation: f32,
}

/// Every feature ranked by activation, plus related features worth exploring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationReport {
    /// All features, strongest activation first.
    pub top_features: Vec<FeatureActivation>,
    /// Features similar to the strongest ones, ascending, excluding those strongest ones.
    pub similar_features: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InspectOptions {
    /// How many of the strongest features seed the similarity search.
    pub top_count: usize,
    /// Similar features sampled per seed.
    pub similar_per_feature: usize,
    /// Fraction of the similarity ranking each sample is drawn from.
    pub similar_top_percent: f64,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            top_count: 10,
            similar_per_feature: 5,
            similar_top_percent: 0.001,
        }
    }
}

/// Encode `embedding` and report feature activations against `catalog`.
pub fn inspect_activations(
    model: &dyn FeatureModel,
    catalog: &FeatureCatalog,
    embedding: ArrayView1<'_, f32>,
    options: &InspectOptions,
    rng: &mut fastrand::Rng,
) -> FeatureResult<ActivationReport> {
    if model.n_features() != catalog.len() {
        return Err(FeatureError::DimensionMismatch {
            expected: catalog.len(),
            actual: model.n_features(),
        });
    }

    let activations = model.encode(embedding)?;
    let ranking = rank_descending(activations.view(), None);
    let seeds = &ranking[..options.top_count.min(ranking.len())];

    let mut similar = Vec::new();
    for &seed in seeds {
        similar.extend(catalog.get_similar_features(
            seed,
            options.similar_per_feature,
            options.similar_top_percent,
            rng,
        )?);
    }
    similar.sort_unstable();
    similar.dedup();
    similar.retain(|f| !seeds.contains(f));

    let top_features = ranking
        .iter()
        .map(|&feature| FeatureActivation {
            feature,
            summary: catalog.summary(feature).unwrap_or_default().to_string(),
            activation: activations[feature],
        })
        .collect();

    debug!(
        seeds = seeds.len(),
        similar = similar.len(),
        "activation report assembled"
    );
    Ok(ActivationReport {
        top_features,
        similar_features: similar,
    })
}

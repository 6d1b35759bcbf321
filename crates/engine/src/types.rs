use serde::{Deserialize, Serialize};

use features::FeatureActivation;
use projection::ProjectedPoint;

/// One `(feature, weight)` term of a steering request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub id: usize,
    pub weight: f32,
}

/// Steer the sentence at `index` (or `sentence`, when not stored) along features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteerRequest {
    pub sentence: String,
    /// Positional index into the store; negative or out of range means "embed `sentence`".
    pub index: i64,
    pub features: Vec<FeatureWeight>,
    pub gen_num: usize,
}

/// Generate variations of `sentence` by applying a free-form instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructRequest {
    pub sentence: String,
    pub instruction: String,
    pub gen_num: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolateRequest {
    pub sentence_a: String,
    pub index_a: i64,
    pub sentence_b: String,
    pub index_b: i64,
    pub gen_num: usize,
}

/// A generated sentence placed in the projection plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPoint {
    pub sentence: String,
    pub umap_x: f32,
    pub umap_y: f32,
    /// Interpolation weight in `(0, 1)`; only set for interpolated points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl GeneratedPoint {
    pub fn new(sentence: String, position: ProjectedPoint, weight: Option<f64>) -> Self {
        Self {
            sentence,
            umap_x: position.x,
            umap_y: position.y,
            weight,
        }
    }
}

/// Feature activations for one sentence plus its neighborhood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationSummary {
    pub top_features: Vec<FeatureActivation>,
    /// Most similar stored sentences, by positional index; empty when the sentence is not stored.
    pub neighbors: Vec<usize>,
    pub similar_features: Vec<usize>,
}

/// Result of a bulk append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AddOutcome {
    /// The store already held at least the expected number of sentences.
    Skipped { entries: usize },
    Added { added: usize, entries: usize },
}

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use store::similarity::{cosine_similarity_matrix, rank_descending};
use tracing::info;

use crate::error::{FeatureError, FeatureResult};

/// Human-readable description attached to one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub feature: usize,
    pub summary: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SummaryFile {
    Records(Vec<FeatureSummary>),
    Keyed(BTreeMap<String, String>),
    Ordered(Vec<String>),
}

/// Parse feature summaries into a dense list of `count` strings.
///
/// Accepts `[{"feature", "summary"}]` records, a `{"id": "summary"}` map or a
/// plain list in feature order. Features without an entry get an empty summary;
/// entries outside `[0, count)` are ignored.
pub fn parse_summaries(bytes: &[u8], count: usize) -> FeatureResult<Vec<String>> {
    let mut summaries = vec![String::new(); count];
    match serde_json::from_slice::<SummaryFile>(bytes)? {
        SummaryFile::Records(records) => {
            for record in records {
                if let Some(slot) = summaries.get_mut(record.feature) {
                    *slot = record.summary;
                }
            }
        }
        SummaryFile::Keyed(map) => {
            for (key, summary) in map {
                let id: usize = key.trim().parse().map_err(|_| {
                    FeatureError::InvalidArgument(format!("summary key `{key}` is not a feature id"))
                })?;
                if let Some(slot) = summaries.get_mut(id) {
                    *slot = summary;
                }
            }
        }
        SummaryFile::Ordered(list) => {
            for (slot, summary) in summaries.iter_mut().zip(list) {
                *slot = summary;
            }
        }
    }
    Ok(summaries)
}

pub fn load_summaries_file(path: impl AsRef<Path>, count: usize) -> FeatureResult<Vec<String>> {
    let bytes = fs::read(path)?;
    parse_summaries(&bytes, count)
}

/// Immutable per-dataset catalog of feature directions.
///
/// The F×F cosine similarity matrix is computed once at construction.
#[derive(Debug, Clone)]
pub struct FeatureCatalog {
    directions: Array2<f32>,
    similarity: Array2<f32>,
    summaries: Vec<String>,
}

impl FeatureCatalog {
    /// Build a catalog from F direction rows and their summaries.
    pub fn new(directions: Array2<f32>, summaries: Vec<String>) -> FeatureResult<Self> {
        if summaries.len() != directions.nrows() {
            return Err(FeatureError::DimensionMismatch {
                expected: directions.nrows(),
                actual: summaries.len(),
            });
        }
        let similarity = cosine_similarity_matrix(directions.view());
        info!(
            features = directions.nrows(),
            dim = directions.ncols(),
            "feature catalog built"
        );
        Ok(Self {
            directions,
            similarity,
            summaries,
        })
    }

    /// Catalog whose directions are the rows of an autoencoder decoder.
    pub fn from_decoder(decoder: ArrayView2<'_, f32>, summaries: Vec<String>) -> FeatureResult<Self> {
        Self::new(decoder.to_owned(), summaries)
    }

    pub fn len(&self) -> usize {
        self.directions.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.nrows() == 0
    }

    /// Embedding dimension of every direction.
    pub fn dim(&self) -> usize {
        self.directions.ncols()
    }

    pub fn check_feature(&self, id: usize) -> FeatureResult<()> {
        if id >= self.len() {
            return Err(FeatureError::FeatureOutOfRange {
                id,
                count: self.len(),
            });
        }
        Ok(())
    }

    pub fn direction(&self, id: usize) -> FeatureResult<ArrayView1<'_, f32>> {
        self.check_feature(id)?;
        Ok(self.directions.row(id))
    }

    pub fn summary(&self, id: usize) -> Option<&str> {
        self.summaries.get(id).map(String::as_str)
    }

    pub fn similarity_matrix(&self) -> ArrayView2<'_, f32> {
        self.similarity.view()
    }

    /// Uniformly sample `k` features from the most similar fraction of the catalog.
    ///
    /// All other features are ranked by similarity to `id`. The candidate pool
    /// is the first `floor((F - 1) * top_percent)` of that ranking, and `k`
    /// distinct members are drawn from it uniformly. The feature itself is
    /// never a candidate.
    pub fn get_similar_features(
        &self,
        id: usize,
        k: usize,
        top_percent: f64,
        rng: &mut fastrand::Rng,
    ) -> FeatureResult<Vec<usize>> {
        self.check_feature(id)?;
        if !top_percent.is_finite() || !(0.0..=1.0).contains(&top_percent) {
            return Err(FeatureError::InvalidArgument(format!(
                "top_percent must be within [0, 1], got {top_percent}"
            )));
        }

        let ranking = rank_descending(self.similarity.row(id), Some(id));
        let pool = ((ranking.len() as f64) * top_percent).floor() as usize;
        let pool = pool.min(ranking.len());
        if pool < k {
            return Err(FeatureError::InsufficientCandidates {
                feature: id,
                k,
                pool,
            });
        }

        let mut candidates = ranking;
        candidates.truncate(pool);
        for i in 0..k {
            let j = rng.usize(i..pool);
            candidates.swap(i, j);
        }
        candidates.truncate(k);
        Ok(candidates)
    }
}

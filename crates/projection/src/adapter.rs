use std::time::Instant;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::info;

use store::EmbeddingStore;

use crate::pca::PcaReducer;
use crate::reducer::Reducer;
use crate::remote::RemoteReducer;
use crate::{ProjectionConfig, ProjectionError, ProjectionResult};

/// A point in the 2-D visualization plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    #[serde(rename = "umap_x")]
    pub x: f32,
    #[serde(rename = "umap_y")]
    pub y: f32,
}

/// Owns the current reducer for one dataset.
pub struct ProjectionAdapter {
    reducer: Box<dyn Reducer>,
}

impl std::fmt::Debug for ProjectionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectionAdapter")
            .field("reducer", &self.reducer.name())
            .field("fitted", &self.reducer.is_fitted())
            .finish()
    }
}

impl ProjectionAdapter {
    pub fn new(reducer: Box<dyn Reducer>) -> Self {
        Self { reducer }
    }

    /// Unfitted adapter for the reducer named by `cfg.mode`.
    pub fn from_config(cfg: &ProjectionConfig) -> ProjectionResult<Self> {
        cfg.validate()?;
        let reducer: Box<dyn Reducer> = match cfg.mode.as_str() {
            "api" => Box::new(RemoteReducer::new(cfg.clone())?),
            _ => Box::new(PcaReducer::new(cfg.n_components)),
        };
        Ok(Self::new(reducer))
    }

    pub fn reducer_name(&self) -> &'static str {
        self.reducer.name()
    }

    pub fn is_fitted(&self) -> bool {
        self.reducer.is_fitted()
    }

    /// Place a batch of new embeddings.
    pub async fn project(&self, embeddings: ArrayView2<'_, f32>) -> ProjectionResult<Vec<ProjectedPoint>> {
        if embeddings.nrows() == 0 {
            return Ok(Vec::new());
        }
        let coords = self.reducer.transform(embeddings).await?;
        to_points(&coords)
    }

    /// Place one embedding as a one-row batch.
    pub async fn project_one(&self, embedding: ArrayView1<'_, f32>) -> ProjectionResult<ProjectedPoint> {
        let batch = embedding.insert_axis(Axis(0));
        self.project(batch)
            .await?
            .pop()
            .ok_or_else(|| ProjectionError::InvalidResponse("no point returned".into()))
    }

    /// Fit a fresh reducer on `embeddings` and swap it in.
    ///
    /// The previous reducer stays in place when fitting fails.
    pub async fn fit(&mut self, embeddings: ArrayView2<'_, f32>) -> ProjectionResult<Vec<ProjectedPoint>> {
        let started = Instant::now();
        let mut next = self.reducer.fresh();
        let coords = next.fit(embeddings).await?;
        let points = to_points(&coords)?;
        self.reducer = next;
        info!(
            reducer = self.reducer.name(),
            rows = embeddings.nrows(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "projector refitted"
        );
        Ok(points)
    }

    /// Refit on every embedding in `store`; returns one point per entry, in order.
    pub async fn refit_all(&mut self, store: &EmbeddingStore) -> ProjectionResult<Vec<ProjectedPoint>> {
        self.fit(store.embeddings()).await
    }
}

fn to_points(coords: &Array2<f32>) -> ProjectionResult<Vec<ProjectedPoint>> {
    if coords.ncols() < 2 {
        return Err(ProjectionError::InvalidResponse(format!(
            "need at least 2 components, got {}",
            coords.ncols()
        )));
    }
    coords
        .outer_iter()
        .map(|row| {
            let (x, y) = (row[0], row[1]);
            if x.is_finite() && y.is_finite() {
                Ok(ProjectedPoint { x, y })
            } else {
                Err(ProjectionError::InvalidResponse(
                    "projection produced a non-finite coordinate".into(),
                ))
            }
        })
        .collect()
}

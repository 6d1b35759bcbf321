use async_trait::async_trait;
use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::reducer::Reducer;
use crate::{ProjectionError, ProjectionResult};

const POWER_ITERATIONS: usize = 50;

/// In-process principal component projection.
///
/// Components are found by power iteration with deflation against the ones
/// already extracted, starting from a fixed trigonometric vector so repeated
/// fits on the same rows give the same axes.
#[derive(Debug, Clone)]
pub struct PcaReducer {
    n_components: usize,
    state: Option<PcaState>,
}

#[derive(Debug, Clone)]
struct PcaState {
    mean: Array1<f32>,
    components: Array2<f32>,
}

impl PcaReducer {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            state: None,
        }
    }

    fn fit_state(&self, data: ArrayView2<'_, f32>) -> ProjectionResult<PcaState> {
        let mean = data.mean_axis(Axis(0)).ok_or(ProjectionError::EmptyInput)?;
        let centered = &data - &mean;
        let dim = data.ncols();
        let mut components = Array2::<f32>::zeros((self.n_components, dim));

        for c in 0..self.n_components {
            let mut axis = seed_axis(c, dim);
            for _ in 0..POWER_ITERATIONS {
                let scores = centered.dot(&axis);
                let mut next = centered.t().dot(&scores);
                for prev in components.outer_iter().take(c) {
                    let overlap = prev.dot(&next);
                    next.scaled_add(-overlap, &prev);
                }
                let norm = next.dot(&next).sqrt();
                if norm <= 1e-9 {
                    break;
                }
                next /= norm;
                axis = next;
            }
            orient(&mut axis);
            components.row_mut(c).assign(&axis);
        }
        Ok(PcaState { mean, components })
    }
}

fn seed_axis(component: usize, dim: usize) -> Array1<f32> {
    let mut axis = Array1::from_shape_fn(dim, |i| {
        ((component + i + 7) as f32 * 0.123).sin() + ((component * i) as f32 * 0.456).cos()
    });
    let norm = axis.dot(&axis).sqrt();
    if norm > 0.0 {
        axis /= norm;
    }
    axis
}

/// Flip `axis` so its largest-magnitude coordinate is positive.
fn orient(axis: &mut Array1<f32>) {
    let pivot = axis
        .iter()
        .copied()
        .fold(0.0_f32, |best, v| if v.abs() > best.abs() { v } else { best });
    if pivot < 0.0 {
        axis.mapv_inplace(|v| -v);
    }
}

fn project(state: &PcaState, data: ArrayView2<'_, f32>) -> Array2<f32> {
    (&data - &state.mean).dot(&state.components.t())
}

#[async_trait]
impl Reducer for PcaReducer {
    fn name(&self) -> &'static str {
        "pca"
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    async fn fit(&mut self, data: ArrayView2<'_, f32>) -> ProjectionResult<Array2<f32>> {
        if data.nrows() == 0 {
            return Err(ProjectionError::EmptyInput);
        }
        let state = self.fit_state(data)?;
        let coords = project(&state, data);
        self.state = Some(state);
        Ok(coords)
    }

    async fn transform(&self, data: ArrayView2<'_, f32>) -> ProjectionResult<Array2<f32>> {
        let state = self.state.as_ref().ok_or(ProjectionError::NotFitted)?;
        if data.ncols() != state.mean.len() {
            return Err(ProjectionError::DimensionMismatch {
                expected: state.mean.len(),
                actual: data.ncols(),
            });
        }
        Ok(project(state, data))
    }

    fn fresh(&self) -> Box<dyn Reducer> {
        Box::new(PcaReducer::new(self.n_components))
    }
}

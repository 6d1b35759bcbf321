use async_trait::async_trait;
use ndarray::{Array2, ArrayView2};

use crate::ProjectionResult;

/// A stateful dimensionality reducer.
///
/// `fit` learns the mapping from a batch and returns that batch's coordinates;
/// `transform` places new rows with the learned mapping.
#[async_trait]
pub trait Reducer: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_fitted(&self) -> bool;

    /// Learn from `data` (N×D) and return its N×C coordinates.
    async fn fit(&mut self, data: ArrayView2<'_, f32>) -> ProjectionResult<Array2<f32>>;

    /// Place `data` (M×D) with the current fit.
    async fn transform(&self, data: ArrayView2<'_, f32>) -> ProjectionResult<Array2<f32>>;

    /// An unfitted reducer with the same settings.
    fn fresh(&self) -> Box<dyn Reducer>;
}

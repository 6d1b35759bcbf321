//! Embedding-space arithmetic used by steering and interpolation.

use ndarray::{Array1, ArrayView1};

use features::{FeatureCatalog, FeatureResult};

use crate::types::FeatureWeight;

/// Scale `v` to unit L2 norm. A zero vector is left as is.
pub fn normalize(v: &mut Array1<f32>) {
    let norm = v.dot(v).sqrt();
    if norm > 0.0 && norm.is_finite() {
        *v /= norm;
    }
}

/// `base + Σ direction[id] · weight`, renormalized.
///
/// Plain vector addition: duplicate ids accumulate and the order of `features`
/// does not matter beyond floating-point rounding.
pub fn compose_steered(
    base: ArrayView1<'_, f32>,
    catalog: &FeatureCatalog,
    features: &[FeatureWeight],
) -> FeatureResult<Array1<f32>> {
    let mut steered = base.to_owned();
    for term in features {
        steered.scaled_add(term.weight, &catalog.direction(term.id)?);
    }
    normalize(&mut steered);
    Ok(steered)
}

/// `n` evenly spaced weights strictly inside `(0, 1)`: `k / (n + 1)` for `k = 1..=n`.
pub fn interpolation_weights(n: usize) -> Vec<f64> {
    let denom = (n + 1) as f64;
    (1..=n).map(|k| k as f64 / denom).collect()
}

/// `(1 - w)·a + w·b`, renormalized.
pub fn lerp_normalized(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>, weight: f64) -> Array1<f32> {
    let w = weight as f32;
    let mut mixed = &a * (1.0 - w) + &b * w;
    normalize(&mut mixed);
    mixed
}

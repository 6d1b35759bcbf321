//! Cosine similarity kernels shared by the embedding store and the feature catalog.
//!
//! Every pair is computed independently with a sequential dot product over
//! unit-scaled rows, so the value at `(i, j)` depends only on rows `i` and `j`.
//! Recomputing the matrix after any mutation therefore yields bit-identical
//! values for untouched pairs.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;
use std::cmp::Ordering;

/// Scale a row to unit length. Zero rows stay zero.
pub fn unit_row(row: ArrayView1<'_, f32>) -> Array1<f32> {
    let norm_sq: f32 = row.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let norm = norm_sq.sqrt();
        row.mapv(|x| x / norm)
    } else {
        row.to_owned()
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Full N×N cosine similarity matrix of `rows`.
///
/// The diagonal is exactly `1.0` for every non-zero row and `0.0` for zero rows.
pub fn cosine_similarity_matrix(rows: ArrayView2<'_, f32>) -> Array2<f32> {
    let n = rows.nrows();
    let units: Vec<Vec<f32>> = rows
        .outer_iter()
        .map(|row| unit_row(row).to_vec())
        .collect();
    let nonzero: Vec<bool> = units.iter().map(|u| u.iter().any(|&x| x != 0.0)).collect();

    let flat: Vec<f32> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let units = &units;
            let nonzero = &nonzero;
            (0..n).map(move |j| {
                if i == j {
                    if nonzero[i] {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    dot(&units[i], &units[j])
                }
            })
        })
        .collect();

    // `flat` always holds exactly n*n values.
    Array2::from_shape_vec((n, n), flat).unwrap_or_else(|_| Array2::zeros((n, n)))
}

/// Indices of `row` ordered by descending value.
///
/// Equal values keep ascending index order (the sort is stable). `exclude`
/// removes one index from the ranking entirely.
pub fn rank_descending(row: ArrayView1<'_, f32>, exclude: Option<usize>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..row.len()).filter(|&i| Some(i) != exclude).collect();
    order.sort_by(|&a, &b| {
        row[b]
            .partial_cmp(&row[a])
            .unwrap_or_else(|| row[b].total_cmp(&row[a]))
    });
    order
}

/// Sort `(index, score)` pairs by descending score, ties by ascending index.
pub fn sort_scored(pairs: &mut [(usize, f32)]) {
    pairs.sort_by(|a, b| match b.1.partial_cmp(&a.1) {
        Some(Ordering::Equal) | None => a.0.cmp(&b.0),
        Some(ord) => ord,
    });
}

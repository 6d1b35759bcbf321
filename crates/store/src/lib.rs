//! # Embedding store
//!
//! An ordered, growable collection of fixed-dimension sentence embeddings
//! together with the full N×N cosine similarity matrix over them.
//!
//! Entries are addressed two ways:
//!
//! - **Positional index** (`0..len`), which shifts down by one for every entry
//!   after a removed one. This is what the HTTP surface speaks.
//! - **[`EntryId`]**, an opaque identifier assigned at insertion and never
//!   reused, so a caller that holds an id across removals keeps pointing at the
//!   same embedding.
//!
//! Every mutation recomputes the similarity matrix from scratch (O(N²·D)).
//! That is the intended ceiling: the corpora this serves stay in the hundreds
//! to low thousands of rows, and full recomputation keeps the matrix
//! bit-for-bit reproducible from the rows alone.
//!
//! ```
//! use ndarray::array;
//! use store::EmbeddingStore;
//!
//! let mut store = EmbeddingStore::new(2);
//! store.add(array![1.0, 0.0].view()).unwrap();
//! store.add(array![0.0, 1.0].view()).unwrap();
//! store.add(array![1.0, 1.0].view()).unwrap();
//!
//! let neighbors = store.nearest_neighbors(0, 1).unwrap();
//! assert_eq!(neighbors[0].index, 2);
//! ```

mod error;
mod query;
pub mod similarity;

pub use crate::error::StoreError;
pub use crate::query::Neighbor;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::similarity::cosine_similarity_matrix;

/// Stable identifier assigned to an embedding when it enters the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Embeddings plus their derived similarity matrix.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    dim: usize,
    embeddings: Array2<f32>,
    ids: Vec<EntryId>,
    next_id: u64,
    similarity: Array2<f32>,
}

impl EmbeddingStore {
    /// Empty store for `dim`-dimensional embeddings.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            embeddings: Array2::zeros((0, dim)),
            ids: Vec::new(),
            next_id: 0,
            similarity: Array2::zeros((0, 0)),
        }
    }

    /// Build a store from an N×D matrix, one embedding per row.
    pub fn from_matrix(embeddings: Array2<f32>) -> Result<Self, StoreError> {
        let dim = embeddings.ncols();
        if dim == 0 {
            return Err(StoreError::InvalidShape(
                "embedding dimension must be greater than zero".into(),
            ));
        }
        let n = embeddings.nrows();
        let mut store = Self {
            dim,
            embeddings: embeddings.as_standard_layout().into_owned(),
            ids: (0..n as u64).map(EntryId).collect(),
            next_id: n as u64,
            similarity: Array2::zeros((0, 0)),
        };
        store.recompute();
        tracing::info!(entries = n, dim, "embedding store initialized");
        Ok(store)
    }

    /// Number of stored embeddings.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Fixed embedding dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Append one embedding and return its new identifier.
    pub fn add(&mut self, embedding: ArrayView1<'_, f32>) -> Result<EntryId, StoreError> {
        self.check_dim(embedding.len())?;
        let ids = self.append_rows(embedding.insert_axis(Axis(0)))?;
        self.recompute();
        let id = ids[0];
        tracing::debug!(id = %id, entries = self.len(), "embedding added");
        Ok(id)
    }

    /// Append every row of `batch` in order.
    ///
    /// The similarity matrix is rebuilt once at the end; because the kernel is
    /// pairwise, the result equals adding the rows one at a time.
    pub fn add_many(&mut self, batch: ArrayView2<'_, f32>) -> Result<Vec<EntryId>, StoreError> {
        self.check_dim(batch.ncols())?;
        if batch.nrows() == 0 {
            return Ok(Vec::new());
        }
        let ids = self.append_rows(batch)?;
        self.recompute();
        tracing::debug!(added = ids.len(), entries = self.len(), "embeddings added");
        Ok(ids)
    }

    /// Delete the entry at `index`; later entries shift down by one.
    pub fn remove(&mut self, index: usize) -> Result<EntryId, StoreError> {
        self.check_index(index)?;
        self.embeddings.remove_index(Axis(0), index);
        let id = self.ids.remove(index);
        self.recompute();
        tracing::debug!(id = %id, index, entries = self.len(), "embedding removed");
        Ok(id)
    }

    /// Delete the entry carrying `id`, returning the position it occupied.
    pub fn remove_by_id(&mut self, id: EntryId) -> Result<usize, StoreError> {
        let index = self.position_of(id).ok_or(StoreError::UnknownId(id))?;
        self.remove(index)?;
        Ok(index)
    }

    /// Overwrite the embedding at `index` in place. The entry keeps its id.
    pub fn replace(
        &mut self,
        index: usize,
        embedding: ArrayView1<'_, f32>,
    ) -> Result<EntryId, StoreError> {
        self.check_index(index)?;
        self.check_dim(embedding.len())?;
        self.embeddings.row_mut(index).assign(&embedding);
        self.recompute();
        let id = self.ids[index];
        tracing::debug!(id = %id, index, "embedding replaced");
        Ok(id)
    }

    /// Embedding at `index`, or `None` when the index is out of range.
    pub fn get(&self, index: usize) -> Option<ArrayView1<'_, f32>> {
        (index < self.len()).then(|| self.embeddings.row(index))
    }

    /// Embedding for a signed caller-supplied index; negative means "not stored".
    pub fn lookup(&self, index: i64) -> Option<ArrayView1<'_, f32>> {
        usize::try_from(index).ok().and_then(|i| self.get(i))
    }

    pub fn get_by_id(&self, id: EntryId) -> Option<ArrayView1<'_, f32>> {
        self.position_of(id).and_then(|i| self.get(i))
    }

    /// Identifier of the entry currently at `index`.
    pub fn id_at(&self, index: usize) -> Option<EntryId> {
        self.ids.get(index).copied()
    }

    /// Current position of `id`.
    pub fn position_of(&self, id: EntryId) -> Option<usize> {
        self.ids.iter().position(|&candidate| candidate == id)
    }

    /// All embeddings as an N×D view.
    pub fn embeddings(&self) -> ArrayView2<'_, f32> {
        self.embeddings.view()
    }

    /// The N×N cosine similarity matrix.
    pub fn similarity_matrix(&self) -> ArrayView2<'_, f32> {
        self.similarity.view()
    }

    /// Cosine similarity between two stored entries.
    pub fn similarity(&self, a: usize, b: usize) -> Option<f32> {
        self.similarity.get((a, b)).copied()
    }

    /// Append `rows` in one step and hand out their ids. Nothing changes on error.
    fn append_rows(&mut self, rows: ArrayView2<'_, f32>) -> Result<Vec<EntryId>, StoreError> {
        self.embeddings
            .append(Axis(0), rows)
            .map_err(|err| StoreError::InvalidShape(err.to_string()))?;
        let ids: Vec<EntryId> = (0..rows.nrows() as u64)
            .map(|offset| EntryId(self.next_id + offset))
            .collect();
        self.next_id += ids.len() as u64;
        self.ids.extend_from_slice(&ids);
        Ok(ids)
    }

    fn recompute(&mut self) {
        self.similarity = cosine_similarity_matrix(self.embeddings.view());
        self.assert_consistent();
    }

    fn assert_consistent(&self) {
        let n = self.ids.len();
        assert_eq!(
            self.embeddings.nrows(),
            n,
            "embedding rows out of sync with entry ids"
        );
        assert_eq!(
            self.embeddings.ncols(),
            self.dim,
            "embedding matrix lost its fixed dimension"
        );
        assert_eq!(
            self.similarity.shape(),
            &[n, n],
            "similarity matrix size does not match store size"
        );
    }

    fn check_dim(&self, actual: usize) -> Result<(), StoreError> {
        if actual != self.dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.dim,
                actual,
            });
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), StoreError> {
        if index >= self.len() {
            return Err(StoreError::OutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(())
    }
}

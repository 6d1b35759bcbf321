use serde::Serialize;

use crate::similarity::sort_scored;
use crate::{EmbeddingStore, EntryId, StoreError};

/// One ranked neighbor of a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    /// Current positional index of the neighbor.
    pub index: usize,
    /// Stable identifier of the neighbor.
    pub id: EntryId,
    /// Cosine similarity to the query entry.
    pub similarity: f32,
}

impl EmbeddingStore {
    /// The `k` entries most similar to the one at `index`, most similar first.
    ///
    /// The query entry itself is never returned, even when another entry is an
    /// exact duplicate of it. Equal similarities keep ascending index order.
    pub fn nearest_neighbors(&self, index: usize, k: usize) -> Result<Vec<Neighbor>, StoreError> {
        let row = self
            .similarity
            .outer_iter()
            .nth(index)
            .ok_or(StoreError::OutOfRange {
                index,
                len: self.len(),
            })?;

        let mut scored: Vec<(usize, f32)> = row
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(i, &s)| (i, s))
            .collect();
        sort_scored(&mut scored);
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| Neighbor {
                index: i,
                id: self.ids[i],
                similarity,
            })
            .collect())
    }
}

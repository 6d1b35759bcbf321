use thiserror::Error;

use crate::EntryId;

/// Errors surfaced by [`EmbeddingStore`](crate::EmbeddingStore) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The supplied vector does not match the store's fixed dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Positional index outside `[0, len)`.
    #[error("index {index} out of range for store of {len} entries")]
    OutOfRange { index: usize, len: usize },
    /// No entry carries this identifier (it was removed or never existed).
    #[error("unknown entry id {0}")]
    UnknownId(EntryId),
    /// The initial matrix cannot back a store.
    #[error("invalid store shape: {0}")]
    InvalidShape(String),
}

use thiserror::Error;

/// Errors surfaced by reducers and the projection adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("invalid projection config: {0}")]
    InvalidConfig(String),
    /// `transform` was called before any successful `fit`.
    #[error("projector has not been fitted")]
    NotFitted,
    #[error("cannot fit a projector on zero embeddings")]
    EmptyInput,
    #[error("projection input dimension mismatch: fitted on {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Transport failure or non-success status from the remote reducer.
    #[error("http failure: {0}")]
    Http(String),
    #[error("invalid projection response: {0}")]
    InvalidResponse(String),
}

pub type ProjectionResult<T> = Result<T, ProjectionError>;

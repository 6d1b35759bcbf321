use std::io;
use thiserror::Error;

/// Errors surfaced while loading, running, or querying the feature model and catalog.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// A tensor the layout requires is absent from the file.
    #[error("missing tensor `{0}`")]
    MissingTensor(String),
    /// A tensor has the wrong rank or extent.
    #[error("tensor `{name}` has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    /// A tensor is stored with a dtype we do not decode.
    #[error("tensor `{name}` has unsupported dtype {dtype}")]
    UnsupportedDtype { name: String, dtype: String },
    /// The metadata-tagged layout named an autoencoder type we do not know.
    #[error("invalid SAE type: {0}")]
    InvalidSaeType(String),
    /// The metadata-tagged layout is missing its header entry.
    #[error("missing safetensors metadata entry `{0}`")]
    MissingMetadata(String),
    /// Raw safetensors parse or serialization failure.
    #[error("safetensors error: {0}")]
    Safetensors(#[from] safetensors::SafeTensorError),
    /// JSON in metadata or summary files could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Low-level IO failures while reading artifacts.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// Input vector length does not match the model or catalog dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Feature id outside `[0, F)`.
    #[error("feature {id} out of range for catalog of {count} features")]
    FeatureOutOfRange { id: usize, count: usize },
    /// Fewer similar-feature candidates than requested samples.
    #[error("feature {feature}: cannot sample {k} similar features from a pool of {pool}")]
    InsufficientCandidates {
        feature: usize,
        k: usize,
        pool: usize,
    },
    /// Argument outside its documented domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type FeatureResult<T> = Result<T, FeatureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_type_message_is_stable() {
        let err = FeatureError::InvalidSaeType("TopKAutoencoder".into());
        assert_eq!(err.to_string(), "invalid SAE type: TopKAutoencoder");
    }

    #[test]
    fn insufficient_candidates_names_counts() {
        let err = FeatureError::InsufficientCandidates {
            feature: 12,
            k: 5,
            pool: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("feature 12"));
        assert!(msg.contains("sample 5"));
        assert!(msg.contains("pool of 2"));
    }

    #[test]
    fn io_errors_convert() {
        let err: FeatureError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("io error"));
    }
}

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use features::FeatureError;
use store::StoreError;

/// External collaborator an operation depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Embed,
    Invert,
    Llm,
    Project,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Embed => "embed",
            Capability::Invert => "invert",
            Capability::Llm => "llm",
            Capability::Project => "project",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by dataset operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed parameters, rejected before any capability is called.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
    #[error("unknown dataset `{0}`")]
    UnknownDataset(String),
    /// Dataset artifacts that cannot be served together.
    #[error("invalid dataset `{name}`: {reason}")]
    InvalidDataset { name: String, reason: String },
    /// A capability call failed or returned something unusable.
    #[error("{capability} capability failed: {message}")]
    Capability {
        capability: Capability,
        message: String,
    },
    #[error("{capability} capability timed out after {}s", .after.as_secs_f32())]
    Timeout {
        capability: Capability,
        after: Duration,
    },
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidRequest(message.into())
    }

    pub(crate) fn capability(capability: Capability, message: impl fmt::Display) -> Self {
        EngineError::Capability {
            capability,
            message: message.to_string(),
        }
    }

    /// Whether the caller may reasonably try the same request again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Timeout { .. })
    }

    /// The capability at fault, when there is one.
    pub fn capability_name(&self) -> Option<Capability> {
        match self {
            EngineError::Capability { capability, .. } | EngineError::Timeout { capability, .. } => {
                Some(*capability)
            }
            _ => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

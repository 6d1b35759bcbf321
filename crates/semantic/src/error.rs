use thiserror::Error;

/// Errors surfaced by the embedding and inversion clients.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SemanticError {
    /// Configuration is inconsistent (e.g., api mode without an endpoint).
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// Transport failure or non-success HTTP status.
    #[error("http failure: {0}")]
    Http(String),
    /// The per-endpoint circuit breaker is rejecting calls.
    #[error("circuit breaker is open for `{0}`, service temporarily unavailable")]
    CircuitOpen(String),
    /// The endpoint answered with a body we cannot interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The endpoint answered with a different number of results than inputs sent.
    #[error("{endpoint} returned {actual} results for {expected} inputs")]
    CountMismatch {
        endpoint: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_config() {
        let err = SemanticError::InvalidConfig("api_url is required".into());
        assert!(err.to_string().contains("invalid semantic config"));
        assert!(err.to_string().contains("api_url is required"));
    }

    #[test]
    fn error_http_keeps_status_text() {
        let err = SemanticError::Http("HTTP error 503 Service Unavailable: busy".into());
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn error_circuit_open_names_endpoint() {
        let err = SemanticError::CircuitOpen("invert".into());
        assert!(err.to_string().contains("`invert`"));
    }

    #[test]
    fn error_count_mismatch() {
        let err = SemanticError::CountMismatch {
            endpoint: "embed",
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "embed returned 2 results for 3 inputs");
    }

    #[test]
    fn error_clone_and_eq() {
        let err = SemanticError::InvalidResponse("missing `sentences`".into());
        assert_eq!(err.clone(), err);
    }
}

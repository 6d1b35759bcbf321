use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use engine::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Engine(err) => match err {
                EngineError::InvalidRequest(_)
                | EngineError::Feature(_)
                | EngineError::Store(_) => StatusCode::BAD_REQUEST,
                EngineError::UnknownDataset(_) => StatusCode::NOT_FOUND,
                EngineError::Capability { .. } => StatusCode::BAD_GATEWAY,
                EngineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                EngineError::InvalidConfig(_) | EngineError::InvalidDataset { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Get error code string
    fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::NotFound => "NOT_FOUND",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Engine(err) => match err {
                EngineError::InvalidRequest(_) => "INVALID_REQUEST",
                EngineError::Feature(_) => "INVALID_FEATURE",
                EngineError::Store(_) => "INVALID_INDEX",
                EngineError::UnknownDataset(_) => "DATASET_NOT_FOUND",
                EngineError::Capability { .. } => "CAPABILITY_FAILED",
                EngineError::Timeout { .. } => "CAPABILITY_TIMEOUT",
                EngineError::InvalidConfig(_) | EngineError::InvalidDataset { .. } => {
                    "INTERNAL_ERROR"
                }
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(status = %status, error = %self, "request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<QueryRejection> for ServerError {
    fn from(err: QueryRejection) -> Self {
        ServerError::BadRequest(err.body_text())
    }
}

impl From<JsonRejection> for ServerError {
    fn from(err: JsonRejection) -> Self {
        ServerError::BadRequest(err.body_text())
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::Capability;
    use std::time::Duration;

    #[test]
    fn engine_errors_map_to_statuses() {
        let cases = [
            (EngineError::InvalidRequest("gen_num".into()), StatusCode::BAD_REQUEST),
            (EngineError::UnknownDataset("x".into()), StatusCode::NOT_FOUND),
            (
                EngineError::Capability {
                    capability: Capability::Invert,
                    message: "down".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                EngineError::Timeout {
                    capability: Capability::Llm,
                    after: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status_code(), status);
        }
    }

    #[test]
    fn error_codes_are_stable() {
        let err = ServerError::from(EngineError::UnknownDataset("poems".into()));
        assert_eq!(err.error_code(), "DATASET_NOT_FOUND");
        assert_eq!(err.to_string(), "unknown dataset `poems`");
    }
}

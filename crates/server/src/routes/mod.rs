//! API route handlers
//!
//! - `health`: liveness, readiness, metrics and metadata
//! - `inspect`: feature activations and neighbors of a sentence
//! - `generate`: steering, instruction variants, interpolation, prompt ideas
//! - `corpus`: adding, editing and removing sentences, re-projection

pub mod corpus;
pub mod generate;
pub mod health;
pub mod inspect;

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::response::IntoResponse;
use axum::Json;
use engine::Dataset;
use serde_json::json;
use std::sync::Arc;

/// API version and base info
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "steerspace",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/top_activations_and_neighbors",
            "/generate_points",
            "/generate_points_llm",
            "/interpolate_points",
            "/add_sentence_manual",
            "/remove_sentence",
            "/edit_sentence",
            "/add_sentences",
            "/get_prompt_ideas",
            "/reembed_sentences",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}

pub(crate) fn dataset(state: &ServerState, name: &str) -> ServerResult<Arc<Dataset>> {
    Ok(state.registry.get(name)?)
}

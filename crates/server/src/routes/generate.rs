//! Sentence generation endpoints.
//!
//! All of them add what they generate to the dataset and answer with the new
//! points in projection coordinates.

use crate::error::{ServerError, ServerResult};
use crate::routes::dataset;
use crate::state::ServerState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use engine::{FeatureWeight, GeneratedPoint, InstructRequest, InterpolateRequest, SteerRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct GeneratePointsQuery {
    pub dataset: String,
    pub sentence: String,
    pub sent_id: i64,
    /// JSON list of `{"id", "weight"}`
    pub feature_ids: String,
    pub gen_num: usize,
}

/// `GET /generate_points`: steer a sentence along features.
pub async fn generate_points(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<GeneratePointsQuery>, QueryRejection>,
) -> ServerResult<Json<Vec<GeneratedPoint>>> {
    let Query(q) = query?;
    let features: Vec<FeatureWeight> = serde_json::from_str(&q.feature_ids)
        .map_err(|e| ServerError::BadRequest(format!("feature_ids: {e}")))?;
    let request = SteerRequest {
        sentence: q.sentence,
        index: q.sent_id,
        features,
        gen_num: q.gen_num,
    };
    let points = dataset(&state, &q.dataset)?.steer(&request).await?;
    Ok(Json(points))
}

#[derive(Debug, Deserialize)]
pub struct GeneratePointsLlmQuery {
    pub dataset: String,
    pub sentence: String,
    pub prompt: String,
    pub gen_num: usize,
}

/// `GET /generate_points_llm`: rewrite a sentence following an instruction.
pub async fn generate_points_llm(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<GeneratePointsLlmQuery>, QueryRejection>,
) -> ServerResult<Json<Vec<GeneratedPoint>>> {
    let Query(q) = query?;
    let request = InstructRequest {
        sentence: q.sentence,
        instruction: q.prompt,
        gen_num: q.gen_num,
    };
    let points = dataset(&state, &q.dataset)?.instruct(&request).await?;
    Ok(Json(points))
}

#[derive(Debug, Deserialize)]
pub struct InterpolateQuery {
    pub dataset: String,
    pub sent1: String,
    pub id1: i64,
    pub sent2: String,
    pub id2: i64,
    pub gen_num: usize,
}

/// `GET /interpolate_points`
pub async fn interpolate_points(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<InterpolateQuery>, QueryRejection>,
) -> ServerResult<Json<Vec<GeneratedPoint>>> {
    let Query(q) = query?;
    let request = InterpolateRequest {
        sentence_a: q.sent1,
        index_a: q.id1,
        sentence_b: q.sent2,
        index_b: q.id2,
        gen_num: q.gen_num,
    };
    let points = dataset(&state, &q.dataset)?.interpolate(&request).await?;
    Ok(Json(points))
}

#[derive(Debug, Deserialize)]
pub struct PromptIdeasQuery {
    pub dataset: String,
    pub sentence: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PromptIdeasResponse {
    pub prompt_ideas: Vec<String>,
}

/// `GET /get_prompt_ideas`
pub async fn get_prompt_ideas(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<PromptIdeasQuery>, QueryRejection>,
) -> ServerResult<Json<PromptIdeasResponse>> {
    let Query(q) = query?;
    let prompt_ideas = dataset(&state, &q.dataset)?.prompt_ideas(&q.sentence).await?;
    Ok(Json(PromptIdeasResponse { prompt_ideas }))
}

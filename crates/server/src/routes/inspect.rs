use crate::error::ServerResult;
use crate::routes::dataset;
use crate::state::ServerState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use engine::ActivationSummary;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct TopActivationsQuery {
    pub dataset: String,
    pub sentence: String,
    /// Positional index; sentences not in the store use -1
    pub id: i64,
}

/// `GET /top_activations_and_neighbors?dataset&sentence&id`
pub async fn top_activations(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<TopActivationsQuery>, QueryRejection>,
) -> ServerResult<Json<ActivationSummary>> {
    let Query(q) = query?;
    let summary = dataset(&state, &q.dataset)?
        .top_activations(&q.sentence, q.id)
        .await?;
    Ok(Json(summary))
}

use crate::error::{ServerError, ServerResult};
use crate::routes::dataset;
use crate::state::ServerState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use engine::{AddOutcome, GeneratedPoint};
use projection::ProjectedPoint;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// `{"success": true, "data": [...]}`
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

/// `{"success": true, "message": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

fn index(raw: i64) -> ServerResult<usize> {
    usize::try_from(raw).map_err(|_| ServerError::BadRequest(format!("id must be >= 0, got {raw}")))
}

#[derive(Debug, Deserialize)]
pub struct AddSentenceBody {
    pub dataset: String,
    pub sentence: String,
}

/// `POST /add_sentence_manual`
pub async fn add_sentence_manual(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<AddSentenceBody>, JsonRejection>,
) -> ServerResult<Json<DataResponse<Vec<GeneratedPoint>>>> {
    let Json(body) = body?;
    let data = dataset(&state, &body.dataset)?
        .add_sentence(&body.sentence)
        .await?;
    Ok(Json(DataResponse {
        success: true,
        data,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RemoveSentenceQuery {
    pub dataset: String,
    pub id: i64,
}

/// `DELETE /remove_sentence?dataset&id`
pub async fn remove_sentence(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<RemoveSentenceQuery>, QueryRejection>,
) -> ServerResult<Json<MessageResponse>> {
    let Query(q) = query?;
    let i = index(q.id)?;
    let remaining = dataset(&state, &q.dataset)?.remove_sentence(i).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: format!("Sentence {i} removed, {remaining} sentences remain"),
    }))
}

#[derive(Debug, Deserialize)]
pub struct EditSentenceBody {
    pub dataset: String,
    pub id: i64,
    pub new_sentence: String,
}

/// `PUT /edit_sentence`
pub async fn edit_sentence(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<EditSentenceBody>, JsonRejection>,
) -> ServerResult<Json<DataResponse<Vec<GeneratedPoint>>>> {
    let Json(body) = body?;
    let i = index(body.id)?;
    let data = dataset(&state, &body.dataset)?
        .edit_sentence(i, &body.new_sentence)
        .await?;
    Ok(Json(DataResponse {
        success: true,
        data,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AddSentencesBody {
    pub dataset: String,
    pub sentences: Vec<String>,
    pub total_sentences: usize,
}

/// `POST /add_sentences`
pub async fn add_sentences(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<AddSentencesBody>, JsonRejection>,
) -> ServerResult<Json<MessageResponse>> {
    let Json(body) = body?;
    let outcome = dataset(&state, &body.dataset)?
        .add_sentences(&body.sentences, body.total_sentences)
        .await?;
    let message = match outcome {
        AddOutcome::Skipped { entries } => {
            format!("Dataset already holds {entries} sentences, nothing added")
        }
        AddOutcome::Added { added, entries } => {
            format!("Added {added} sentences, dataset now holds {entries}")
        }
    };
    Ok(Json(MessageResponse {
        success: true,
        message,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ReembedBody {
    pub dataset: String,
}

/// `POST /reembed_sentences`: refit the projection on the whole dataset.
pub async fn reembed_sentences(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<ReembedBody>, JsonRejection>,
) -> ServerResult<Json<Vec<ProjectedPoint>>> {
    let Json(body) = body?;
    let points = dataset(&state, &body.dataset)?.refit_projection().await?;
    Ok(Json(points))
}

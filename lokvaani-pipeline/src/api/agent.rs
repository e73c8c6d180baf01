//! Policy assistant endpoints

use crate::rag::{AgentStatus, Answer, SyncReport};
use crate::{ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(alias = "post_id")]
    pub post_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    #[serde(alias = "post_id")]
    pub post_id: String,
    pub question: String,
}

/// POST /agent/sync
pub async fn sync(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> ApiResult<Json<SyncReport>> {
    Ok(Json(state.rag.sync(&request.post_id).await?))
}

/// POST /agent/ask
pub async fn ask(State(state): State<AppState>, Json(request): Json<AskRequest>) -> ApiResult<Json<Answer>> {
    Ok(Json(state.rag.ask(&request.post_id, &request.question).await?))
}

/// GET /agent/status/:post_id
pub async fn status(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<AgentStatus>> {
    Ok(Json(state.rag.status(&post_id).await?))
}

pub fn agent_routes() -> Router<AppState> {
    Router::new()
        .route("/agent/sync", post(sync))
        .route("/agent/ask", post(ask))
        .route("/agent/status/:post_id", get(status))
}

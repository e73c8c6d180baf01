//! Summary snapshot endpoints

use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lokvaani_common::db::PostSummary;

/// POST /posts/:id/summaries
pub async fn create_snapshot(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<(StatusCode, Json<PostSummary>)> {
    let summary = state.aggregation.create_snapshot(&post_id).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// GET /posts/:id/summaries (newest first)
pub async fn snapshot_timeline(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Vec<PostSummary>>> {
    Ok(Json(state.aggregation.snapshot_timeline(&post_id).await?))
}

/// GET /posts/:id/summaries/latest
pub async fn latest_snapshot(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<PostSummary>> {
    state
        .aggregation
        .latest_snapshot(&post_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no summary for post {}", post_id)))
}

/// GET /summaries/:id
pub async fn snapshot_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PostSummary>> {
    state
        .aggregation
        .snapshot_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("summary {}", id)))
}

pub fn summary_routes() -> Router<AppState> {
    Router::new()
        .route("/posts/:id/summaries", post(create_snapshot).get(snapshot_timeline))
        .route("/posts/:id/summaries/latest", get(latest_snapshot))
        .route("/summaries/:id", get(snapshot_by_id))
}

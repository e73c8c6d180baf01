//! Draft registration

use crate::db;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::put,
    Json, Router,
};
use lokvaani_common::db::Post;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct RegisterPostRequest {
    pub title: Option<String>,
    pub extracted_text: Option<String>,
}

/// PUT /posts/:id
///
/// Omitted fields keep their stored value.
pub async fn register_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(payload): Json<RegisterPostRequest>,
) -> ApiResult<Json<Post>> {
    if post_id.trim().is_empty() {
        return Err(ApiError::BadRequest("post id is required".to_string()));
    }

    let post = db::posts::upsert_post(
        &state.db,
        &post_id,
        payload.title.as_deref(),
        payload.extracted_text.as_deref(),
    )
    .await?;

    info!(post_id = %post.id, has_text = post.extracted_text.is_some(), "Draft registered");
    Ok(Json(post))
}

pub fn post_routes() -> Router<AppState> {
    Router::new().route("/posts/:id", put(register_post))
}

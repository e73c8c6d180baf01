//! Per-draft statistics endpoints

use crate::aggregation::{ClauseBucket, KeywordCount};
use crate::{ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use lokvaani_common::events::{CategoryTypeCounts, SentimentCounts, WeightedSentiment};
use serde::Deserialize;

const DEFAULT_KEYWORD_LIMIT: usize = 20;

/// GET /posts/:id/counts
pub async fn counts(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<SentimentCounts>> {
    Ok(Json(state.aggregation.counts(Some(&post_id)).await?))
}

/// GET /posts/:id/counts/categorized
pub async fn categorized_counts(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<CategoryTypeCounts>> {
    Ok(Json(state.aggregation.categorized_counts(Some(&post_id)).await?))
}

/// GET /posts/:id/weightage
pub async fn weightage(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<WeightedSentiment>> {
    Ok(Json(state.aggregation.weightage(Some(&post_id)).await?))
}

/// GET /posts/:id/clauses
pub async fn clauses(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Vec<ClauseBucket>>> {
    Ok(Json(state.aggregation.clauses(&post_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct KeywordQuery {
    pub limit: Option<usize>,
}

/// GET /posts/:id/keywords?limit=N
pub async fn keywords(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Query(query): Query<KeywordQuery>,
) -> ApiResult<Json<Vec<KeywordCount>>> {
    let limit = query.limit.unwrap_or(DEFAULT_KEYWORD_LIMIT);
    Ok(Json(state.aggregation.keywords(&post_id, limit).await?))
}

pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/posts/:id/counts", get(counts))
        .route("/posts/:id/counts/categorized", get(categorized_counts))
        .route("/posts/:id/weightage", get(weightage))
        .route("/posts/:id/clauses", get(clauses))
        .route("/posts/:id/keywords", get(keywords))
}

//! Health check endpoint

use crate::workers::{pipeline_health, PipelineHealth};
use crate::{ApiResult, AppState};
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" or "degraded"
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub sse_subscribers: usize,
    pub pipeline: PipelineHealth,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let pipeline = pipeline_health(&state.db, state.max_processing_attempts).await?;

    Ok(Json(HealthResponse {
        status: if pipeline.is_degraded() { "degraded" } else { "ok" }.to_string(),
        module: "lokvaani-pipeline".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        sse_subscribers: state.broadcast.subscriber_count(),
        pipeline,
    }))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

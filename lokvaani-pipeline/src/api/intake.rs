//! Manual comment submission endpoint

use crate::intake::{IntakeOutcome, Submission};
use crate::{ApiResult, AppState};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

/// POST /comments
///
/// 200 with the analyzed (or failed) record when analysis settles it within
/// the wait; 202 with the still-RAW record otherwise.
pub async fn submit_comment(
    State(state): State<AppState>,
    Json(submission): Json<Submission>,
) -> ApiResult<(StatusCode, Json<IntakeOutcome>)> {
    let outcome = state.intake.submit(submission).await?;
    let status = if outcome.completed {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(outcome)))
}

pub fn intake_routes() -> Router<AppState> {
    Router::new().route("/comments", post(submit_comment))
}

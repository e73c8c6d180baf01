//! Error types for the pipeline HTTP surface
//!
//! Request/response paths (Q&A, manual submission, snapshots) report failures
//! as `{"error": {"code": KIND, "message": ...}}`.

use crate::rag::RagError;
use crate::services::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// An external enrichment service failed (502)
    #[error("Upstream service error: {0}")]
    Upstream(#[from] ServiceError),

    /// lokvaani-common error
    #[error("Common error: {0}")]
    Common(lokvaani_common::Error),
}

impl From<lokvaani_common::Error> for ApiError {
    fn from(err: lokvaani_common::Error) -> Self {
        match err {
            lokvaani_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            lokvaani_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Common(other),
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::PostNotFound(post_id) => ApiError::NotFound(format!("post {}", post_id)),
            RagError::InvalidInput(msg) => ApiError::BadRequest(msg),
            RagError::Service(e) => ApiError::Upstream(e),
            RagError::Store(e) => e.into(),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Common(lokvaani_common::Error::Database(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Upstream(ref err) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_not_found_maps_to_404() {
        let err: ApiError = lokvaani_common::Error::NotFound("post p1".to_string()).into();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unknown_post_on_sync_maps_to_404() {
        let err: ApiError = RagError::PostNotFound("p1".to_string()).into();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_upstream_maps_to_502() {
        let err: ApiError = ServiceError::Network("connection refused".to_string()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}

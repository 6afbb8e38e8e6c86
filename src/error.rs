//! Crate-wide error type.
//!
//! Mirrors the error taxonomy in spec §7: validation errors are rejected
//! before any side effect, precondition errors are returned as part of a
//! per-section result rather than aborting the request, and everything else
//! maps to a 500 with the underlying cause logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("student not found")]
    StudentNotFound,

    #[error("student is inactive")]
    StudentInactive,

    #[error("registration is not in enrolled status")]
    NotEnrolled,

    #[error("idempotency key reused with a different request body")]
    IdempotencyConflict,

    #[error("queue is full")]
    QueueFull,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("seat counter store error: {0}")]
    Counter(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    fn status(&self) -> StatusCode {
        match self {
            CoreError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CoreError::StudentNotFound => StatusCode::BAD_REQUEST,
            CoreError::StudentInactive => StatusCode::BAD_REQUEST,
            CoreError::NotEnrolled => StatusCode::BAD_REQUEST,
            CoreError::IdempotencyConflict => StatusCode::CONFLICT,
            CoreError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::Database(_) | CoreError::Counter(_) | CoreError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidRequest(_) => "invalid_request",
            CoreError::StudentNotFound => "student_not_found",
            CoreError::StudentInactive => "student_inactive",
            CoreError::NotEnrolled => "not_enrolled",
            CoreError::IdempotencyConflict => "idempotency_conflict",
            CoreError::QueueFull => "queue_full",
            CoreError::Database(_) => "internal",
            CoreError::Counter(_) => "internal",
            CoreError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        if matches!(
            self,
            CoreError::Database(_) | CoreError::Counter(_) | CoreError::Internal(_)
        ) {
            tracing::error!(error = %self, "request failed with internal error");
        }

        let status = self.status();
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

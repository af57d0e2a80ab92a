//! HTTP error responses.
//!
//! Every failure leaves a handler as an `ApiErrorResponse`: a status code
//! plus a JSON body `{"code": ..., "message": ...}`. Backend failures are
//! logged here and answered with a generic message.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use todo_core::{TaskError, TodoError};

/// JSON body of an error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    pub status: StatusCode,
    pub error: ApiError,
}

impl ApiErrorResponse {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: ApiError {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "An internal error occurred",
        )
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<TodoError> for ApiErrorResponse {
    fn from(error: TodoError) -> Self {
        match error {
            TodoError::ListNotFound(_) | TodoError::TodoNotFound { .. } => {
                Self::not_found(error.to_string())
            }
            TodoError::Validation { .. } => Self::validation(error.to_string()),
            TodoError::Store(_) | TodoError::Search(_) => {
                tracing::error!(%error, "backend failure");
                Self::internal()
            }
        }
    }
}

impl From<TaskError> for ApiErrorResponse {
    fn from(error: TaskError) -> Self {
        match error {
            TaskError::QueueClosed => {
                tracing::warn!(%error, "enqueue refused");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "QUEUE_UNAVAILABLE",
                    error.to_string(),
                )
            }
        }
    }
}

impl From<JsonRejection> for ApiErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiErrorResponse {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiErrorResponse {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

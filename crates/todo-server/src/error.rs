//! Mapping of todo errors onto HTTP responses

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use todo_core::TodoError;

/// Result type alias for handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Domain and store errors from the repository
    #[error(transparent)]
    Todo(#[from] TodoError),

    /// Request body could not be read as JSON
    #[error("Malformed request body: {0}")]
    BadRequest(String),
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Todo(TodoError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Todo(TodoError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "Todo not found".to_string())
            }
            ApiError::Todo(TodoError::Store(e)) => {
                tracing::error!("Store operation failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage operation failed".to_string(),
                )
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

//! HTTP error responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::conversation::ConversationError;

/// Generic message for failures whose details stay in the logs.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Error returned by route handlers, rendered as `{"error": message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Missing or invalid request data (400).
    BadRequest(String),
    /// Unknown resource (404).
    NotFound(String),
    /// Refused in the current state (409).
    Conflict(String),
    /// Upstream or storage failure (500).
    Internal(String),
}

impl ApiError {
    /// Status code of the error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m) | Self::NotFound(m) | Self::Conflict(m) | Self::Internal(m) => m,
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Log `err` with `context` and hide it behind `message`.
    pub(crate) fn internal(context: &str, err: &dyn std::error::Error, message: &str) -> Self {
        error!("{context}: {err}");
        Self::Internal(message.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<ConversationError> for ApiError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::NotFound(id) => Self::NotFound(format!("Conversation {id} not found")),
            ConversationError::ActionNotAllowed(action) => {
                Self::Conflict(format!("Action {action} is not available yet"))
            }
            ConversationError::Busy => {
                Self::Conflict("A generation is already in progress".to_string())
            }
            ConversationError::InvalidInput(message) => Self::BadRequest(message),
            other => Self::internal("Conversation step failed", &other, INTERNAL_MESSAGE),
        }
    }
}

/// Result alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

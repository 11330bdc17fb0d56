//! API error types and JSON error response formatting.
//!
//! ApiError provides a consistent JSON error response format across all
//! endpoints. The `From<ChatError>` impl is the single containment site for
//! chat failures: every error is logged there with its full context, then
//! mapped to the phase's static user notice and status code. Nothing is
//! retried and nothing propagates past this boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use refdesk_chat::ChatError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid parameters.
    BadRequest(String),
    /// 404 Not Found - resource does not exist.
    NotFound(String),
    /// 409 Conflict - state conflict (e.g., a turn already in flight).
    Conflict(String),
    /// 500 Internal Server Error - a processing phase failed.
    Internal(String),
    /// 503 Service Unavailable - initialization failed.
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match &err {
            // The four phase errors: log raw context, surface the static
            // notice, halt the cycle.
            ChatError::Initialization(_)
            | ChatError::LogRender(_)
            | ChatError::BackendCall(_)
            | ChatError::ResponseRender(_) => {
                tracing::error!(error = %err, "chat phase failed");
                let notice = err.user_notice();
                match err {
                    ChatError::Initialization(_) => ApiError::ServiceUnavailable(notice),
                    _ => ApiError::Internal(notice),
                }
            }
            ChatError::EmptyMessage | ChatError::MessageTooLong(_) => {
                tracing::debug!(error = %err, "chat request rejected");
                ApiError::BadRequest(err.to_string())
            }
            ChatError::SessionNotFound(_) => {
                tracing::debug!(error = %err, "chat session missing");
                ApiError::NotFound(err.to_string())
            }
            ChatError::Busy => {
                tracing::debug!(error = %err, "chat session busy");
                ApiError::Conflict(err.notice().to_string())
            }
        }
    }
}

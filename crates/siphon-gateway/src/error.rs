//! Pipeline error taxonomy and HTTP response formatting.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use siphon_broker::PublishError;

/// Outcome of a failed ingest call.
///
/// Every failure is classified into exactly one of these kinds at the point
/// of detection, before it crosses the HTTP boundary. Internal causes are
/// logged with detail; the response carries only the class-appropriate
/// message.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Malformed or unsupported payload (400).
    #[error("invalid request: {0}")]
    Validation(String),

    /// Missing or bad credentials, or insufficient permission (401).
    /// Deliberately carries no cause: callers cannot distinguish unknown
    /// streams, unknown users, or missing grants.
    #[error("unauthorized")]
    Auth,

    /// Unknown or unauthorized stream (404).
    #[error("stream not found")]
    NotFound,

    /// Dependencies not ready; always retryable by the caller (503).
    #[error("service unavailable, dependencies not ready")]
    Unavailable,

    /// Broker write failed after the recovery path (500).
    #[error("failed to ingest request")]
    Publish(#[from] PublishError),

    /// Unexpected internal failure, e.g. serialization (500).
    #[error("internal error")]
    Internal(String),
}

impl IngestError {
    /// Outcome label recorded on the request counter.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Validation(_) => "bad_request",
            Self::Auth => "unauthorized",
            Self::NotFound => "not_found",
            Self::Unavailable => "unavailable",
            Self::Publish(_) => "publish_failed",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            Self::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                Some(msg.clone()),
            ),
            Self::Auth => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                "stream_not_found",
                Some("Stream not found".to_string()),
            ),
            Self::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                Some("Service unavailable, dependencies not ready".to_string()),
            ),
            Self::Publish(err) => {
                tracing::error!(error = %err, "failed to publish to broker");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "publish_failed",
                    Some("Failed to ingest request".to_string()),
                )
            }
            Self::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    Some("An internal error occurred".to_string()),
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

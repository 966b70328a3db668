//! HTTP-facing error type.
//!
//! Every failure that crosses the HTTP boundary is one of these kinds, with a
//! message that is safe to show to clients. Transport and storage errors are
//! logged where they happen and replaced here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::client::CallError;
use crate::proxy::ForwardError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or insufficient input.
    #[error("{0}")]
    Validation(String),

    /// Bad credentials or a missing/invalid token.
    #[error("{0}")]
    Auth(String),

    /// Bot verification failed.
    #[error("{0}")]
    Verification(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_json() -> Self {
        ApiError::Validation("invalid JSON".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Verification(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = %status, error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<CallError> for ApiError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Unauthenticated(_) => ApiError::Auth("invalid credentials".to_string()),
            // Backend validation messages are written for clients.
            CallError::InvalidArgument(msg) => ApiError::Validation(msg),
            CallError::VerificationFailed(_) => {
                ApiError::Verification("turnstile verification failed".to_string())
            }
            CallError::Internal(_) => ApiError::Internal("internal error".to_string()),
            CallError::Unavailable(_) => {
                ApiError::UpstreamUnavailable("service unavailable".to_string())
            }
        }
    }
}

impl From<ForwardError> for ApiError {
    fn from(err: ForwardError) -> Self {
        match err {
            ForwardError::UpstreamUnavailable(_) => {
                ApiError::UpstreamUnavailable("upstream unavailable".to_string())
            }
            ForwardError::InvalidUri(_) => ApiError::Internal("internal error".to_string()),
        }
    }
}

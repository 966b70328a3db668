//! Error types for outbound RPC calls.

use std::error::Error as _;
use std::time::Duration;

use thiserror::Error;
use tonic::Code;

/// Failure while establishing a backend connection at startup.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid address {address:?} for backend {backend}: {reason}")]
    InvalidAddress {
        backend: String,
        address: String,
        reason: String,
    },

    #[error("backend {backend} not ready after {timeout:?}")]
    NotReady { backend: String, timeout: Duration },
}

/// Outcome of a failed call, already translated out of the transport's
/// vocabulary. Handlers match on this, never on `tonic::Status`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("backend error: {0}")]
    Internal(String),

    /// Unreachable, cancelled or past its deadline.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl CallError {
    pub fn deadline_exceeded() -> Self {
        CallError::Unavailable("deadline exceeded".to_string())
    }

    pub fn closed() -> Self {
        CallError::Unavailable("connection closed".to_string())
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CallError::Unauthenticated(_) => "unauthenticated",
            CallError::InvalidArgument(_) => "invalid_argument",
            CallError::VerificationFailed(_) => "verification_failed",
            CallError::Internal(_) => "internal",
            CallError::Unavailable(_) => "unavailable",
        }
    }
}

impl From<tonic::Status> for CallError {
    fn from(status: tonic::Status) -> Self {
        let message = status.message().to_string();
        match status.code() {
            Code::Unauthenticated | Code::NotFound => CallError::Unauthenticated(message),
            Code::InvalidArgument => CallError::InvalidArgument(message),
            Code::PermissionDenied => CallError::VerificationFailed(message),
            Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled => {
                CallError::Unavailable(message)
            }
            // Connect failures surface as `Unknown` with the transport error as source.
            Code::Unknown if is_transport_failure(&status) => CallError::Unavailable(message),
            _ => CallError::Internal(message),
        }
    }
}

fn is_transport_failure(status: &tonic::Status) -> bool {
    let mut source = status.source();
    while let Some(err) = source {
        if err.is::<tonic::transport::Error>() || err.is::<std::io::Error>() {
            return true;
        }
        source = err.source();
    }
    false
}

//! Error types for the remote facade
//!
//! Every facade call fails with a [`RemoteError`]. Callers in the
//! orchestration layer classify it instead of propagating it:
//! - authentication absence is fatal to the call
//! - transport failures are recovered locally by each consumer
//! - non-success responses carry the operation name and body for logging

/// Errors produced by [`crate::RemoteApi`] implementations
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// No active session could supply a credential
    #[error("not authenticated")]
    NotAuthenticated,

    /// HTTP transport failure (connect, timeout, body read)
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend unreachable or otherwise unavailable
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// Backend answered with a non-success status
    #[error("{operation} failed: {status} - {body}")]
    Status {
        /// Facade operation that failed
        operation: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Requested resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Update carried neither a title nor a snapshot
    #[error("document patch has no fields to update")]
    EmptyPatch,
}

impl RemoteError {
    /// Check if error is an authentication failure
    #[inline]
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
            || matches!(self, Self::Status { status: 401 | 403, .. })
    }

    /// Check if error is a transport-level failure that may clear up on its own
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Http(_) | Self::Unavailable(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

//! Error types for the sync layer
//!
//! Most orchestrator operations never fail: transport errors are recovered
//! where they occur and turned into status transitions. [`SyncError`] covers
//! the few calls that do report to the caller:
//! - opening a document session
//! - immediate (non-debounced) writes and flushes
//! - loading configuration

use wb_remote::RemoteError;

/// Main sync error type
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Remote facade call failed
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Configuration could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// Session was torn down
    #[error("session closed")]
    Closed,
}

impl SyncError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote(err) if err.is_transport())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

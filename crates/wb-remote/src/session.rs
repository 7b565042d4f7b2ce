//! Session provider seam
//!
//! The authentication/session provider is an external collaborator. The
//! facade only asks it for the current bearer credential before each call.

use parking_lot::RwLock;

/// Source of the per-call authorization credential
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current access token, or `None` when no session is active
    async fn access_token(&self) -> Option<String>;
}

/// Session backed by a fixed, replaceable token
///
/// Used by the CLI (token from the environment) and by tests.
#[derive(Debug, Default)]
pub struct StaticSession {
    token: RwLock<Option<String>>,
}

impl StaticSession {
    /// Create session with an active token
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Create session with no active token
    #[inline]
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Replace the active token
    pub fn sign_in(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Drop the active token
    pub fn sign_out(&self) {
        *self.token.write() = None;
    }
}

#[async_trait::async_trait]
impl SessionProvider for StaticSession {
    async fn access_token(&self) -> Option<String> {
        self.token.read().clone().filter(|t| !t.is_empty())
    }
}

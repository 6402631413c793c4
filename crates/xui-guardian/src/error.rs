//! Guardian error types

use crate::state::GuardianPhase;
use xui_session::PersistenceError;

/// Main guardian error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum GuardianError {
    /// The authentication backend rejected or failed the request
    #[error("authentication failed: {0}")]
    Backend(#[from] AuthError),

    /// Token could not be stored or cleared
    #[error("token storage failed: {0}")]
    Persistence(#[from] PersistenceError),

    /// Operation needs a logged-in user
    #[error("not logged in")]
    NotLoggedIn,

    /// State change not allowed from the current phase
    #[error("illegal guardian transition: {from} -> {to}")]
    IllegalTransition {
        /// Phase before the change
        from: GuardianPhase,
        /// Rejected phase
        to: GuardianPhase,
    },
}

impl GuardianError {
    /// Check if the error came from the backend
    #[inline]
    #[must_use]
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

/// Failure reported by an [`AuthBackend`](crate::AuthBackend)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthError {
    message: String,
}

impl AuthError {
    /// Create backend error
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Error message
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

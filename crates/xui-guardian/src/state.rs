//! Guardian state and phase transitions

use crate::error::GuardianError;
use std::fmt;

/// Authentication flags and the current user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardianState<U> {
    /// First token read and user fetch finished, successfully or not
    pub initialised: bool,
    /// User record is being fetched
    pub fetching_user_data: bool,
    /// A user record was fetched with the current token
    pub is_logged_in: bool,
    /// The stored token could not retrieve a user
    pub has_invalid_token: bool,
    /// Current user
    pub user: Option<U>,
}

impl<U> Default for GuardianState<U> {
    fn default() -> Self {
        Self {
            initialised: false,
            fetching_user_data: false,
            is_logged_in: false,
            has_invalid_token: false,
            user: None,
        }
    }
}

impl<U> GuardianState<U> {
    /// Phase implied by the flags
    #[must_use]
    pub fn phase(&self) -> GuardianPhase {
        if self.fetching_user_data {
            GuardianPhase::Fetching
        } else if self.is_logged_in {
            GuardianPhase::Authenticated
        } else if self.has_invalid_token {
            GuardianPhase::InvalidToken
        } else if !self.initialised {
            GuardianPhase::Uninitialised
        } else {
            GuardianPhase::Anonymous
        }
    }
}

/// Coarse guardian phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardianPhase {
    /// Token not read yet
    Uninitialised,
    /// Waiting for the user record
    Fetching,
    /// No user
    Anonymous,
    /// Stored token was rejected
    InvalidToken,
    /// User record loaded
    Authenticated,
}

impl fmt::Display for GuardianPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Validate a phase change
///
/// # Errors
/// Returns [`GuardianError::IllegalTransition`] if `to` is not reachable from `from`
pub fn validate_transition(from: GuardianPhase, to: GuardianPhase) -> Result<(), GuardianError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(GuardianError::IllegalTransition { from, to })
    }
}

/// Phases reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: GuardianPhase) -> Vec<GuardianPhase> {
    use GuardianPhase as P;
    match from {
        P::Uninitialised => vec![P::Fetching, P::Anonymous],
        P::Fetching => vec![P::Authenticated, P::InvalidToken],
        P::Anonymous => vec![P::Fetching],
        P::InvalidToken => vec![P::Fetching, P::Anonymous],
        P::Authenticated => vec![P::Fetching, P::Anonymous, P::Uninitialised],
    }
}

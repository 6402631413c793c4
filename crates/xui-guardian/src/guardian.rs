//! Authentication state holder

use crate::backend::{AuthBackend, GuardianUser};
use crate::error::GuardianError;
use crate::state::{validate_transition, GuardianPhase, GuardianState};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use xui_bus::{EventBus, Subscription};
use xui_session::SideStore;

/// Side-store key holding the authentication token
pub const TOKEN_STORAGE_KEY: &str = "xui-token";

/// Notification emitted by a [`Guardian`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardianEvent {
    /// Token was read, stored or cleared
    TokenUpdated {
        /// New token, `None` when cleared
        token: Option<String>,
    },
    /// Credentials were exchanged for a token
    LoggedIn {
        /// Issued token
        token: String,
    },
    /// The user logged out
    LoggedOut {
        /// Identifier of the user that left
        user_id: Option<String>,
    },
}

/// Outcome of a role check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Guardian not initialised yet
    Loading,
    /// Allowed
    Granted,
    /// Not allowed
    Denied,
}

/// Authentication state holder
///
/// State changes are validated against the phase table; an illegal change is
/// rejected and leaves the state as it was. Event listeners run without any
/// internal lock held.
pub struct Guardian<B: AuthBackend> {
    backend: Arc<B>,
    side_store: Arc<dyn SideStore>,
    token_key: String,
    state: Mutex<GuardianState<B::User>>,
    token: Mutex<Option<String>>,
    events: EventBus<GuardianEvent>,
}

impl<B: AuthBackend> Guardian<B> {
    /// Create guardian; call [`Guardian::init`] before use
    #[must_use]
    pub fn new(backend: Arc<B>, side_store: Arc<dyn SideStore>, token_key: impl Into<String>) -> Self {
        Self {
            backend,
            side_store,
            token_key: token_key.into(),
            state: Mutex::new(GuardianState::default()),
            token: Mutex::new(None),
            events: EventBus::new(),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> GuardianState<B::User> {
        self.state.lock().clone()
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> GuardianPhase {
        self.state.lock().phase()
    }

    /// Current token
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    /// Current user
    #[must_use]
    pub fn user(&self) -> Option<B::User> {
        self.state.lock().user.clone()
    }

    /// Event bus carrying [`GuardianEvent`]s
    #[inline]
    #[must_use]
    pub fn events(&self) -> &EventBus<GuardianEvent> {
        &self.events
    }

    /// Observe events until the guard is dropped
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&GuardianEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(callback)
    }

    /// Read the stored token and resolve the user it belongs to
    ///
    /// The guardian is initialised afterwards whatever the outcome; a rejected
    /// token shows up as [`GuardianState::has_invalid_token`], not as an error.
    ///
    /// # Errors
    /// Returns [`GuardianError::Persistence`] if a rejected token cannot be
    /// cleared from the side-store
    pub async fn init(&self) -> Result<(), GuardianError> {
        let token = match self.side_store.read(&self.token_key).await {
            Ok(token) => token,
            Err(error) => {
                tracing::warn!(%error, "stored token unreadable");
                None
            }
        };
        *self.token.lock() = token.clone();
        self.events.emit(&GuardianEvent::TokenUpdated { token: token.clone() });

        let loaded = match token {
            Some(token) => self.load(&token).await,
            None => Ok(()),
        };
        self.transition(|s| s.initialised = true)?;
        tracing::info!(phase = %self.phase(), "guardian initialised");

        match loaded {
            Err(GuardianError::Backend(_)) => Ok(()),
            other => other,
        }
    }

    /// Log in with credentials
    ///
    /// Returns the issued token once the user record is loaded.
    ///
    /// # Errors
    /// - [`GuardianError::Backend`] if the credentials are rejected or the
    ///   user cannot be fetched with the new token
    /// - [`GuardianError::Persistence`] if the token cannot be stored
    pub async fn login(&self, username: &str, password: &str) -> Result<String, GuardianError> {
        self.transition(|s| s.has_invalid_token = false)?;

        let token = self.backend.login(username, password).await?;
        tracing::info!(username, "login accepted");
        self.events.emit(&GuardianEvent::LoggedIn { token: token.clone() });

        self.store_token(Some(token.clone())).await?;
        self.load(&token).await?;
        Ok(token)
    }

    /// Create an account
    ///
    /// If the backend issues a token right away, the user is logged in with
    /// it. Returns the token, or `None` when email verification is pending.
    ///
    /// # Errors
    /// As [`Guardian::login`]
    pub async fn register(&self, registration: &B::Registration) -> Result<Option<String>, GuardianError> {
        let token = self.backend.register(registration).await?;
        match &token {
            Some(token) => {
                self.store_token(Some(token.clone())).await?;
                self.load(token).await?;
            }
            None => tracing::info!("registration awaits email verification"),
        }
        Ok(token)
    }

    /// Exchange an email verification token and log in with the result
    ///
    /// # Errors
    /// As [`Guardian::login`]
    pub async fn verify_email(&self, email_token: &str) -> Result<String, GuardianError> {
        let token = self.backend.verify_email(email_token).await?;
        self.store_token(Some(token.clone())).await?;
        self.load(&token).await?;
        Ok(token)
    }

    /// Log out and forget the token
    ///
    /// # Errors
    /// - [`GuardianError::NotLoggedIn`] without a logged-in user
    /// - [`GuardianError::Backend`] if the server refuses; the session is kept
    /// - [`GuardianError::Persistence`] if the token cannot be cleared
    pub async fn logout(&self) -> Result<(), GuardianError> {
        let logged_in = self.state.lock().is_logged_in;
        let token = match (logged_in, self.token()) {
            (true, Some(token)) => token,
            _ => return Err(GuardianError::NotLoggedIn),
        };
        self.backend.logout(&token).await?;

        let user_id = self.user().map(|u| u.user_id());
        self.events.emit(&GuardianEvent::LoggedOut { user_id: user_id.clone() });
        self.store_token(None).await?;
        self.transition(|s| {
            s.is_logged_in = false;
            s.user = None;
            s.fetching_user_data = false;
        })?;
        tracing::info!(user_id = ?user_id, "logged out");
        Ok(())
    }

    /// Check if the current user has `role`
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.state
            .lock()
            .user
            .as_ref()
            .is_some_and(|u| u.roles().iter().any(|r| r == role))
    }

    /// Decide access for a guarded resource
    ///
    /// With no roles, any logged-in user is granted; otherwise the user needs
    /// at least one of `roles`.
    #[must_use]
    pub fn access(&self, roles: &[&str]) -> Access {
        let state = self.state.lock();
        if !state.initialised {
            return Access::Loading;
        }
        let granted = match state.user.as_ref() {
            Some(user) if state.is_logged_in => {
                roles.is_empty() || roles.iter().any(|role| user.roles().iter().any(|r| r == role))
            }
            _ => false,
        };
        if granted {
            Access::Granted
        } else {
            Access::Denied
        }
    }

    async fn load(&self, token: &str) -> Result<(), GuardianError> {
        self.transition(|s| s.fetching_user_data = true)?;

        match self.backend.fetch_user(token).await {
            Ok(user) => {
                tracing::debug!(user_id = %user.user_id(), "user loaded");
                self.transition(|s| {
                    s.user = Some(user);
                    s.is_logged_in = true;
                    s.has_invalid_token = false;
                    s.fetching_user_data = false;
                })
            }
            Err(error) => {
                tracing::warn!(%error, "token rejected, clearing");
                self.transition(|s| {
                    s.user = None;
                    s.is_logged_in = false;
                    s.has_invalid_token = true;
                    s.fetching_user_data = false;
                })?;
                self.store_token(None).await?;
                Err(error.into())
            }
        }
    }

    async fn store_token(&self, token: Option<String>) -> Result<(), GuardianError> {
        *self.token.lock() = token.clone();
        self.events.emit(&GuardianEvent::TokenUpdated { token: token.clone() });

        match token {
            Some(token) => self.side_store.write(&self.token_key, token).await?,
            None => self.side_store.remove(&self.token_key).await?,
        }
        Ok(())
    }

    fn transition<F>(&self, change: F) -> Result<(), GuardianError>
    where
        F: FnOnce(&mut GuardianState<B::User>),
    {
        let mut state = self.state.lock();
        let mut next = state.clone();
        change(&mut next);

        let (from, to) = (state.phase(), next.phase());
        if from != to {
            validate_transition(from, to)?;
            tracing::debug!(%from, %to, "guardian transition");
        }
        *state = next;
        Ok(())
    }
}

impl<B: AuthBackend> fmt::Debug for Guardian<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guardian")
            .field("phase", &self.phase())
            .field("token_key", &self.token_key)
            .field("side_store", &self.side_store)
            .finish_non_exhaustive()
    }
}

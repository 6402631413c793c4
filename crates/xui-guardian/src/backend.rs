//! Authentication backend seam

use crate::error::AuthError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// User record as seen by the guardian
pub trait GuardianUser: Clone + Send + Sync + 'static {
    /// Stable user identifier
    fn user_id(&self) -> String;

    /// Roles granted to the user
    fn roles(&self) -> &[String];
}

/// Server-side authentication operations
///
/// Tokens are opaque strings; the guardian only stores and forwards them.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// User record type
    type User: GuardianUser;

    /// Registration payload type
    type Registration: Send + Sync;

    /// Fetch the user a token belongs to
    async fn fetch_user(&self, token: &str) -> Result<Self::User, AuthError>;

    /// Exchange credentials for a token
    async fn login(&self, username: &str, password: &str) -> Result<String, AuthError>;

    /// Create an account
    ///
    /// Returns `None` when the account must verify its email before a token
    /// is issued.
    async fn register(&self, registration: &Self::Registration) -> Result<Option<String>, AuthError>;

    /// Exchange an email verification token for a session token
    async fn verify_email(&self, email_token: &str) -> Result<String, AuthError>;

    /// Invalidate a token server-side
    async fn logout(&self, token: &str) -> Result<(), AuthError>;
}

/// Display name fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
}

/// Default user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultUser {
    /// User identifier
    #[serde(rename = "_id")]
    pub id: String,
    /// Login email
    pub email: String,
    /// Display name
    #[serde(default)]
    pub profile: UserProfile,
    /// Granted roles
    #[serde(default)]
    pub roles: Vec<String>,
}

impl GuardianUser for DefaultUser {
    fn user_id(&self) -> String {
        self.id.clone()
    }

    fn roles(&self) -> &[String] {
        &self.roles
    }
}

/// Default registration payload
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultRegistration {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Login email
    pub email: String,
    /// Chosen password
    pub password: String,
}

impl fmt::Debug for DefaultRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultRegistration")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

//! XUI Guardian
//!
//! Holds who the current user is. The authentication token lives in a
//! [`SideStore`](xui_session::SideStore) so a restart can resume the session;
//! everything that talks to the server goes through an [`AuthBackend`].
//!
//! # Core Concepts
//!
//! - [`GuardianState`]: Flags and user record, read as a [`GuardianPhase`]
//! - [`Guardian`]: Drives login, registration, verification and logout
//! - [`GuardianEvent`]: Token and login notifications on an event bus
//! - [`Access`]: Outcome of a role check, including "still loading"
//!
//! # Phases
//!
//! ```text
//! Uninitialised ─┬─> Anonymous <──────────────┐
//!                └─> Fetching ─┬─> Authenticated
//!                              └─> InvalidToken
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use xui_guardian::{Access, Guardian, TOKEN_STORAGE_KEY};
//!
//! let guardian = Guardian::new(Arc::new(backend), side_store, TOKEN_STORAGE_KEY);
//! guardian.init().await?;
//! guardian.login("ada", "secret").await?;
//! assert_eq!(guardian.access(&["ADMIN"]), Access::Granted);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod backend;
mod error;
mod guardian;
mod state;

pub use backend::{AuthBackend, DefaultRegistration, DefaultUser, GuardianUser, UserProfile};
pub use error::{AuthError, GuardianError};
pub use guardian::{Access, Guardian, GuardianEvent, TOKEN_STORAGE_KEY};
pub use state::{allowed_transitions, validate_transition, GuardianPhase, GuardianState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

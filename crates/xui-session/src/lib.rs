//! XUI Session Store
//!
//! Field-keyed session state with per-field interception, change
//! notification, and optional persistence to a durable side-store.
//!
//! # Core Concepts
//!
//! - [`SessionSchema`]: Closed set of fields and their defaults
//! - [`ReactiveStore`]: Get/set access, one handler per field, listeners
//! - [`FieldBinding`]: Self-updating view of one field, released on drop
//! - [`SideStore`]: Durable key-value collaborator
//!   ([`MemorySideStore`], [`FileSideStore`])
//!
//! # Set pipeline
//!
//! 1. The field handler, if any, maps `(previous, proposed)` to the value
//!    that is committed
//! 2. The committed value replaces the field in a new state snapshot
//! 3. A [`FieldChange`] goes to listeners of that field
//! 4. With [`SetOptions::persist`], the value is merged into the persisted
//!    mapping and `set` resolves after the write completes
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use xui_session::{ReactiveStore, SessionSchema, SetOptions};
//!
//! let schema = SessionSchema::builder()
//!     .field("lastAuthenticationTime", 0)
//!     .build();
//! let store = ReactiveStore::new(schema);
//!
//! store.on_set("lastAuthenticationTime", |prev, next| {
//!     json!(prev.as_i64().unwrap_or(0) + next.as_i64().unwrap_or(0))
//! })?;
//! store.set("lastAuthenticationTime", 50, SetOptions::default()).await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod binding;
mod error;
mod persisted;
mod schema;
mod side_store;
mod store;

pub use binding::FieldBinding;
pub use error::{ConfigurationError, PersistenceError, StoreError};
pub use persisted::{load_persisted, merge_persisted};
pub use schema::{SessionSchema, SessionSchemaBuilder, DEFAULT_STORAGE_KEY};
pub use side_store::{FileSideStore, MemorySideStore, SideStore};
pub use store::{FieldChange, ReactiveStore, SetOptions};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

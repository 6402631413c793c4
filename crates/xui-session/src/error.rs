//! Error types for the session store
//!
//! - [`ConfigurationError`]: misuse of the store API; the call fails before
//!   any state changes
//! - [`PersistenceError`]: side-store failures; reads degrade to defaults,
//!   writes are returned to the caller of `set`

use std::path::PathBuf;
use std::sync::Arc;

/// Main session store error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Invalid use of the store
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Durable write failed
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl StoreError {
    /// Check if this is a configuration error
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is a persistence error
    #[inline]
    #[must_use]
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

/// Store misuse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// Field is not part of the schema
    #[error("unknown field: '{0}'")]
    UnknownField(String),

    /// Field already has a handler
    #[error("handler already registered for field '{0}'")]
    DuplicateHandler(String),

    /// Field has no handler to remove
    #[error("no handler registered for field '{0}'")]
    HandlerNotFound(String),

    /// Listener id is not registered
    #[error("listener not found: {0}")]
    ListenerNotFound(String),

    /// Value does not have the requested type
    #[error("type mismatch for field '{key}': {reason}")]
    TypeMismatch {
        /// Field key
        key: String,
        /// Conversion failure
        reason: String,
    },
}

impl ConfigurationError {
    /// Create type mismatch error
    #[must_use]
    pub fn type_mismatch(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// Side-store failure
#[derive(Debug, Clone, thiserror::Error)]
pub enum PersistenceError {
    /// Persistence requested on a store opened without a side-store
    #[error("no side-store configured")]
    Unavailable,

    /// IO error against a file-backed side-store
    #[error("io error at {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Value could not be encoded
    #[error("serialization failed: {0}")]
    Serialize(String),

    /// Side-store specific failure
    #[error("side-store failure: {0}")]
    Backend(String),
}

impl PersistenceError {
    /// Create IO error for path
    #[must_use]
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

//! Closed field schema with defaults

use crate::error::ConfigurationError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Side-store key holding the persisted session mapping
pub const DEFAULT_STORAGE_KEY: &str = "xui-session";

/// Fixed set of session fields and their default values
///
/// Cheap to clone; fields cannot be added once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSchema {
    defaults: Arc<BTreeMap<String, Value>>,
}

impl SessionSchema {
    /// Start building a schema
    #[inline]
    #[must_use]
    pub fn builder() -> SessionSchemaBuilder {
        SessionSchemaBuilder::default()
    }

    /// Schema from a JSON object of defaults
    #[must_use]
    pub fn from_defaults(defaults: Map<String, Value>) -> Self {
        Self {
            defaults: Arc::new(defaults.into_iter().collect()),
        }
    }

    /// Check if the schema declares `key`
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.defaults.contains_key(key)
    }

    /// Reject keys outside the schema
    ///
    /// # Errors
    /// Returns [`ConfigurationError::UnknownField`] if `key` is not declared
    pub fn check(&self, key: &str) -> Result<(), ConfigurationError> {
        if self.contains(key) {
            Ok(())
        } else {
            Err(ConfigurationError::UnknownField(key.to_string()))
        }
    }

    /// Default value for a field
    #[inline]
    #[must_use]
    pub fn default_value(&self, key: &str) -> Option<&Value> {
        self.defaults.get(key)
    }

    /// Field keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.defaults.keys().map(String::as_str)
    }

    /// Number of fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    /// Check if the schema has no fields
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }

    /// Initial state: defaults overridden by persisted values for declared keys
    #[must_use]
    pub fn seed(&self, persisted: &Map<String, Value>) -> im::HashMap<String, Value> {
        self.defaults
            .iter()
            .map(|(key, default)| {
                let value = persisted.get(key).unwrap_or(default).clone();
                (key.clone(), value)
            })
            .collect()
    }
}

/// Builder for [`SessionSchema`]
#[derive(Debug, Default)]
pub struct SessionSchemaBuilder {
    defaults: BTreeMap<String, Value>,
}

impl SessionSchemaBuilder {
    /// Declare a field; a repeated key keeps the last default
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, default: impl Into<Value>) -> Self {
        self.defaults.insert(key.into(), default.into());
        self
    }

    /// Finish the schema
    #[must_use]
    pub fn build(self) -> SessionSchema {
        SessionSchema {
            defaults: Arc::new(self.defaults),
        }
    }
}

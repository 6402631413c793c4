//! Live view of a single field

use crate::error::{ConfigurationError, StoreError};
use crate::store::ReactiveStore;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use xui_bus::Subscription;

/// Current value of one field, kept up to date by the store
///
/// Every committed `set` of the field is reflected before `set` returns.
/// Dropping the binding detaches it from the store.
#[derive(Debug)]
pub struct FieldBinding {
    key: String,
    value: Arc<Mutex<Option<Value>>>,
    subscription: Subscription,
}

impl FieldBinding {
    /// Subscribes before reading the current value; a value delivered in
    /// between wins over the read.
    pub(crate) fn attach(store: &ReactiveStore, key: &str) -> Result<Self, StoreError> {
        let value = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&value);
        let subscription = store.subscribe(key, move |change| {
            *slot.lock() = Some(change.value.clone());
        })?;
        let current = store.get(key)?;
        value.lock().get_or_insert(current);

        Ok(Self {
            key: key.to_string(),
            value,
            subscription,
        })
    }

    /// Field key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Latest committed value
    #[must_use]
    pub fn get(&self) -> Value {
        self.value.lock().clone().unwrap_or_default()
    }

    /// Latest committed value, deserialized
    ///
    /// # Errors
    /// Returns [`ConfigurationError::TypeMismatch`] if the value is not a `T`
    pub fn get_as<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.get()).map_err(|e| ConfigurationError::type_mismatch(&self.key, e).into())
    }

    /// Check if the binding still receives updates
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }
}

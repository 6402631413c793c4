//! Reactive session store

use crate::binding::FieldBinding;
use crate::error::{ConfigurationError, PersistenceError, StoreError};
use crate::persisted::{load_persisted, merge_persisted};
use crate::schema::SessionSchema;
use crate::side_store::SideStore;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use xui_bus::{EventBus, ListenerId, Subscription};

type Handler = Arc<dyn Fn(&Value, Value) -> Result<Value, ConfigurationError> + Send + Sync>;

/// Options for [`ReactiveStore::set`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Write the committed value through to the side-store
    pub persist: bool,
}

impl SetOptions {
    /// Options that persist the value
    #[inline]
    #[must_use]
    pub fn persist() -> Self {
        Self { persist: true }
    }
}

/// Committed change to one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// Field key
    pub key: String,
    /// Committed value
    pub value: Value,
    /// Value before the change
    pub previous_value: Value,
}

#[derive(Debug)]
struct Persistence {
    side_store: Arc<dyn SideStore>,
    storage_key: String,
}

struct StoreInner {
    schema: SessionSchema,
    writer: tokio::sync::Mutex<()>,
    state: Mutex<im::HashMap<String, Value>>,
    handlers: Mutex<HashMap<String, Handler>>,
    bus: EventBus<FieldChange>,
    persistence: Option<Persistence>,
}

/// Session state container
///
/// Cloning yields another handle to the same store. Handlers and listeners
/// run without any state lock held, so they may read the store.
///
/// Sets are serialized: each one runs its handler, commits, notifies and
/// persists before the next begins, so handlers always see the latest
/// committed value and the side-store receives writes in commit order.
///
/// # Invariants
/// - only schema keys are ever present
/// - at most one handler per key
/// - state is replaced on commit, never mutated; snapshots stay valid
#[derive(Clone)]
pub struct ReactiveStore {
    inner: Arc<StoreInner>,
}

impl ReactiveStore {
    /// Create store seeded from schema defaults, without persistence
    #[must_use]
    pub fn new(schema: SessionSchema) -> Self {
        let state = schema.seed(&Map::new());
        Self::from_parts(schema, state, None)
    }

    /// Create store seeded from defaults overridden by persisted values
    ///
    /// Unreadable or malformed persisted data is logged and ignored.
    pub async fn open(
        schema: SessionSchema,
        side_store: Arc<dyn SideStore>,
        storage_key: impl Into<String>,
    ) -> Self {
        let storage_key = storage_key.into();
        let persisted = load_persisted(side_store.as_ref(), &storage_key).await;
        let restored = persisted.keys().filter(|k| schema.contains(k)).count();
        tracing::debug!(storage_key = %storage_key, restored, "session store opened");

        let state = schema.seed(&persisted);
        Self::from_parts(
            schema,
            state,
            Some(Persistence {
                side_store,
                storage_key,
            }),
        )
    }

    fn from_parts(
        schema: SessionSchema,
        state: im::HashMap<String, Value>,
        persistence: Option<Persistence>,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                schema,
                writer: tokio::sync::Mutex::new(()),
                state: Mutex::new(state),
                handlers: Mutex::new(HashMap::new()),
                bus: EventBus::new(),
                persistence,
            }),
        }
    }

    /// Field schema
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &SessionSchema {
        &self.inner.schema
    }

    /// Check if a side-store is attached
    #[inline]
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.inner.persistence.is_some()
    }

    /// Current value of a field
    ///
    /// # Errors
    /// Returns [`ConfigurationError::UnknownField`] for keys outside the schema
    pub fn get(&self, key: &str) -> Result<Value, StoreError> {
        self.inner.schema.check(key)?;
        self.inner
            .state
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownField(key.to_string()).into())
    }

    /// Current value of a field, deserialized
    ///
    /// # Errors
    /// Returns [`ConfigurationError::TypeMismatch`] if the value is not a `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let value = self.get(key)?;
        serde_json::from_value(value).map_err(|e| ConfigurationError::type_mismatch(key, e).into())
    }

    /// Immutable view of every field
    #[must_use]
    pub fn snapshot(&self) -> im::HashMap<String, Value> {
        self.inner.state.lock().clone()
    }

    /// Set a field
    ///
    /// Runs the field handler, commits, notifies listeners of `key`, then
    /// persists if requested. Returns the committed value.
    ///
    /// # Errors
    /// - [`ConfigurationError`] for unknown keys or a failing typed handler;
    ///   nothing is committed
    /// - [`PersistenceError::Unavailable`] if persistence is requested without
    ///   a side-store; nothing is committed
    /// - any other [`PersistenceError`] if the durable write fails; the value
    ///   stays committed in memory and listeners have been notified
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<Value>,
        options: SetOptions,
    ) -> Result<Value, StoreError> {
        self.inner.schema.check(key)?;
        if options.persist && self.inner.persistence.is_none() {
            return Err(PersistenceError::Unavailable.into());
        }

        let proposed = value.into();
        let _writer = self.inner.writer.lock().await;

        let previous_value = self.get(key)?;
        let handler = self.inner.handlers.lock().get(key).cloned();
        let committed = match handler {
            Some(handler) => handler(&previous_value, proposed)?,
            None => proposed,
        };

        {
            let mut state = self.inner.state.lock();
            *state = state.update(key.to_string(), committed.clone());
        }
        tracing::debug!(key, persist = options.persist, "session field set");

        self.inner.bus.emit(&FieldChange {
            key: key.to_string(),
            value: committed.clone(),
            previous_value,
        });

        if options.persist {
            if let Some(persistence) = &self.inner.persistence {
                merge_persisted(
                    persistence.side_store.as_ref(),
                    &persistence.storage_key,
                    key,
                    &committed,
                )
                .await
                .map_err(|error| {
                    tracing::error!(%error, key, "session field not persisted");
                    error
                })?;
            }
        }

        Ok(committed)
    }

    /// Set a field from any serializable value
    ///
    /// # Errors
    /// As [`ReactiveStore::set`], plus [`PersistenceError::Serialize`] if
    /// `value` cannot be encoded
    pub async fn set_as<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<Value, StoreError> {
        let value = serde_json::to_value(value).map_err(|e| PersistenceError::Serialize(e.to_string()))?;
        self.set(key, value, options).await
    }

    /// Register the handler for a field
    ///
    /// The handler receives `(previous, proposed)` and returns the value to
    /// commit.
    ///
    /// # Errors
    /// - [`ConfigurationError::UnknownField`] for keys outside the schema
    /// - [`ConfigurationError::DuplicateHandler`] if the field already has one
    pub fn on_set<F>(&self, key: &str, handler: F) -> Result<(), StoreError>
    where
        F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
    {
        self.register_handler(
            key,
            Arc::new(move |previous: &Value, proposed: Value| {
                Ok::<_, ConfigurationError>(handler(previous, &proposed))
            }),
        )
    }

    /// Register a handler working on deserialized values
    ///
    /// A value that does not deserialize as `T` makes `set` fail with
    /// [`ConfigurationError::TypeMismatch`] before anything is committed.
    ///
    /// # Errors
    /// As [`ReactiveStore::on_set`]
    pub fn on_set_typed<T, F>(&self, key: &str, handler: F) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned + 'static,
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        let field = key.to_string();
        self.register_handler(
            key,
            Arc::new(move |previous: &Value, proposed: Value| {
                let previous: T = serde_json::from_value(previous.clone())
                    .map_err(|e| ConfigurationError::type_mismatch(&field, e))?;
                let proposed: T = serde_json::from_value(proposed)
                    .map_err(|e| ConfigurationError::type_mismatch(&field, e))?;
                serde_json::to_value(handler(previous, proposed))
                    .map_err(|e| ConfigurationError::type_mismatch(&field, e))
            }),
        )
    }

    /// Remove the handler for a field
    ///
    /// # Errors
    /// - [`ConfigurationError::UnknownField`] for keys outside the schema
    /// - [`ConfigurationError::HandlerNotFound`] if the field has none
    pub fn on_set_remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.schema.check(key)?;
        match self.inner.handlers.lock().remove(key) {
            Some(_) => Ok(()),
            None => Err(ConfigurationError::HandlerNotFound(key.to_string()).into()),
        }
    }

    /// Check if a field has a handler
    #[must_use]
    pub fn has_handler(&self, key: &str) -> bool {
        self.inner.handlers.lock().contains_key(key)
    }

    /// Observe committed changes to one field until the guard is dropped
    ///
    /// # Errors
    /// Returns [`ConfigurationError::UnknownField`] for keys outside the schema
    pub fn subscribe<F>(&self, key: &str, callback: F) -> Result<Subscription, StoreError>
    where
        F: Fn(&FieldChange) + Send + Sync + 'static,
    {
        self.inner.schema.check(key)?;
        let field = key.to_string();
        Ok(self.inner.bus.subscribe_filtered(callback, move |change| change.key == field))
    }

    /// Observe committed changes to one field until [`ReactiveStore::unlisten`]
    ///
    /// # Errors
    /// Returns [`ConfigurationError::UnknownField`] for keys outside the schema
    pub fn listen<F>(&self, key: &str, callback: F) -> Result<ListenerId, StoreError>
    where
        F: Fn(&FieldChange) + Send + Sync + 'static,
    {
        self.inner.schema.check(key)?;
        let field = key.to_string();
        Ok(self.inner.bus.add_filtered_listener(callback, move |change| change.key == field))
    }

    /// Remove a listener registered with [`ReactiveStore::listen`]
    ///
    /// # Errors
    /// Returns [`ConfigurationError::ListenerNotFound`] if `id` is not registered
    pub fn unlisten(&self, id: ListenerId) -> Result<(), StoreError> {
        self.inner
            .bus
            .remove_listener(id)
            .map_err(|e| ConfigurationError::ListenerNotFound(e.to_string()).into())
    }

    /// Self-updating view of one field
    ///
    /// # Errors
    /// Returns [`ConfigurationError::UnknownField`] for keys outside the schema
    pub fn bind(&self, key: &str) -> Result<FieldBinding, StoreError> {
        FieldBinding::attach(self, key)
    }

    fn register_handler(&self, key: &str, handler: Handler) -> Result<(), StoreError> {
        self.inner.schema.check(key)?;
        let mut handlers = self.inner.handlers.lock();
        if handlers.contains_key(key) {
            return Err(ConfigurationError::DuplicateHandler(key.to_string()).into());
        }
        handlers.insert(key.to_string(), handler);
        Ok(())
    }
}

impl fmt::Debug for ReactiveStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveStore")
            .field("fields", &self.inner.schema.len())
            .field("handlers", &self.inner.handlers.lock().len())
            .field("listeners", &self.inner.bus.len())
            .field("persistence", &self.inner.persistence)
            .finish()
    }
}

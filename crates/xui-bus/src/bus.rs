//! Listener registry and event delivery

use crate::error::BusError;
use crate::subscription::Subscription;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;
type Filter<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Identity of a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Raw numeric value
    #[inline]
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

struct Listener<E> {
    id: ListenerId,
    handler: Handler<E>,
    filter: Option<Filter<E>>,
    active: Arc<AtomicBool>,
}

impl<E> Listener<E> {
    fn accepts(&self, event: &E) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }
}

struct Inner<E> {
    listeners: Mutex<Vec<Arc<Listener<E>>>>,
    next_id: AtomicU64,
}

impl<E> Inner<E> {
    fn detach(&self, id: ListenerId) -> Option<Arc<Listener<E>>> {
        let mut guard = self.listeners.lock();
        let position = guard.iter().position(|l| l.id == id)?;
        let listener = guard.remove(position);
        listener.active.store(false, Ordering::Release);
        Some(listener)
    }
}

/// Typed publish/subscribe bus
///
/// Cloning an `EventBus` yields another handle to the same listener list.
pub struct EventBus<E> {
    inner: Arc<Inner<E>>,
}

impl<E> EventBus<E> {
    /// Create bus with no listeners
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a listener that receives every event
    pub fn add_listener<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(Arc::new(handler), None).0
    }

    /// Register a listener that receives events accepted by `filter`
    pub fn add_filtered_listener<F, P>(&self, handler: F, filter: P) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.register(Arc::new(handler), Some(Arc::new(filter))).0
    }

    /// Remove a listener
    ///
    /// # Errors
    /// Returns [`BusError::ListenerNotFound`] if `id` is not registered
    pub fn remove_listener(&self, id: ListenerId) -> Result<(), BusError> {
        match self.inner.detach(id) {
            Some(_) => {
                tracing::trace!(%id, "listener removed");
                Ok(())
            }
            None => Err(BusError::ListenerNotFound(id)),
        }
    }

    /// Check if a listener is registered
    #[must_use]
    pub fn contains(&self, id: ListenerId) -> bool {
        self.inner.listeners.lock().iter().any(|l| l.id == id)
    }

    /// Number of registered listeners
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Check if no listeners are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every accepting listener
    ///
    /// Returns the number of listeners that were invoked.
    pub fn emit(&self, event: &E) -> usize {
        let listeners: Vec<Arc<Listener<E>>> = self.inner.listeners.lock().clone();

        let mut delivered = 0;
        for listener in listeners {
            // Removal may have happened while earlier listeners ran.
            if !listener.active.load(Ordering::Acquire) {
                continue;
            }
            if !listener.accepts(event) {
                continue;
            }
            (listener.handler)(event);
            delivered += 1;
        }
        delivered
    }

    fn register(&self, handler: Handler<E>, filter: Option<Filter<E>>) -> (ListenerId, Arc<AtomicBool>) {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let active = Arc::new(AtomicBool::new(true));
        self.inner.listeners.lock().push(Arc::new(Listener {
            id,
            handler,
            filter,
            active: Arc::clone(&active),
        }));
        tracing::trace!(%id, "listener registered");
        (id, active)
    }
}

impl<E: 'static> EventBus<E> {
    /// Register a listener and return a guard that removes it on drop
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let (id, active) = self.register(Arc::new(handler), None);
        self.guard(id, active)
    }

    /// Register a filtered listener and return a guard that removes it on drop
    pub fn subscribe_filtered<F, P>(&self, handler: F, filter: P) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let (id, active) = self.register(Arc::new(handler), Some(Arc::new(filter)));
        self.guard(id, active)
    }

    fn guard(&self, id: ListenerId, active: Arc<AtomicBool>) -> Subscription {
        let weak: Weak<Inner<E>> = Arc::downgrade(&self.inner);
        Subscription::new(id, active, move |id| {
            if let Some(inner) = weak.upgrade() {
                inner.detach(id);
            }
        })
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.len())
            .finish()
    }
}

//! RAII listener guard

use crate::bus::ListenerId;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Detach = Box<dyn FnOnce(ListenerId) + Send + Sync>;

/// Guard for a registered listener
///
/// The listener stays registered while the guard is alive. Dropping the
/// guard, or calling [`Subscription::unsubscribe`], removes it. Both are
/// safe to repeat and safe after the bus itself is gone.
pub struct Subscription {
    id: ListenerId,
    active: Arc<AtomicBool>,
    detach: Option<Detach>,
}

impl Subscription {
    pub(crate) fn new<F>(id: ListenerId, active: Arc<AtomicBool>, detach: F) -> Self
    where
        F: FnOnce(ListenerId) + Send + Sync + 'static,
    {
        Self {
            id,
            active,
            detach: Some(Box::new(detach)),
        }
    }

    /// Listener id backing this subscription
    #[inline]
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Check if the listener can still be invoked
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Remove the listener now
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(detach) = self.detach.take() {
            detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

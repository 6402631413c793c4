//! Async driver binding a live set to an inbound stream

use crate::entity::Entity;
use crate::error::TransportError;
use crate::live_set::LiveSet;
use crate::sink::SnapshotSink;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Shared stop flag with wake-up
///
/// The flag is checked before every callback and sink delivery, so a stop
/// issued from anywhere takes effect even for work already in progress.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopSignal {
    /// Create unset signal
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake the driver; idempotent
    ///
    /// Returns `true` if this call performed the stop.
    pub fn stop(&self) -> bool {
        let first = !self.stopped.swap(true, Ordering::AcqRel);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    /// Check if stopped
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Resolve once stopped
    pub async fn stopped(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent stop cannot be missed.
            notified.as_mut().enable();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}

/// Handle to a live set running on its own task
///
/// Messages are consumed one at a time in stream order; each is fully
/// applied before the next is polled.
#[derive(Debug)]
pub struct LiveSubscription<E: Entity, S: SnapshotSink<E>> {
    signal: StopSignal,
    task: JoinHandle<LiveSet<E, S>>,
}

impl<E, S> LiveSubscription<E, S>
where
    E: Entity,
    S: SnapshotSink<E> + 'static,
{
    /// Spawn a task feeding `stream` into `live_set`
    ///
    /// The task ends on stop, on a transport error (reported to the sink as
    /// terminal), or when the stream is exhausted.
    pub fn spawn<St>(live_set: LiveSet<E, S>, stream: St) -> Self
    where
        St: Stream<Item = Result<Value, TransportError>> + Send + 'static,
    {
        let signal = live_set.stop_signal();
        let task = tokio::spawn(drive(live_set, stream));
        Self { signal, task }
    }

    /// Detach from the stream; idempotent
    ///
    /// Returns `true` if this call performed the stop.
    pub fn stop(&self) -> bool {
        self.signal.stop()
    }

    /// Check if stopped
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.signal.is_stopped()
    }

    /// Stop signal shared with the running live set
    #[inline]
    #[must_use]
    pub fn signal(&self) -> StopSignal {
        self.signal.clone()
    }

    /// Wait for the task to end and take back the live set
    ///
    /// Returns `None` if the task panicked.
    pub async fn join(self) -> Option<LiveSet<E, S>> {
        match self.task.await {
            Ok(live_set) => Some(live_set),
            Err(error) => {
                tracing::error!(%error, "live set task failed");
                None
            }
        }
    }
}

async fn drive<E, S, St>(mut live_set: LiveSet<E, S>, stream: St) -> LiveSet<E, S>
where
    E: Entity,
    S: SnapshotSink<E>,
    St: Stream<Item = Result<Value, TransportError>> + Send,
{
    let signal = live_set.stop_signal();
    let mut stream = Box::pin(stream);

    loop {
        if signal.is_stopped() {
            break;
        }
        let next = tokio::select! {
            biased;
            () = signal.stopped() => break,
            next = stream.next() => next,
        };
        match next {
            Some(Ok(raw)) => live_set.handle(raw),
            Some(Err(error)) => {
                live_set.fail(error);
                break;
            }
            None => {
                tracing::debug!("inbound stream ended");
                live_set.stop();
                break;
            }
        }
    }
    live_set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_signal_idempotent() {
        let signal = StopSignal::new();
        assert!(!signal.is_stopped());
        assert!(signal.stop());
        assert!(!signal.stop());
        assert!(signal.clone().is_stopped());
    }

    #[tokio::test]
    async fn stop_signal_wakes_waiter() {
        let signal = StopSignal::new();
        let waiter = signal.clone();
        let task = tokio::spawn(async move { waiter.stopped().await });

        tokio::task::yield_now().await;
        signal.stop();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn stopped_resolves_immediately_when_already_stopped() {
        let signal = StopSignal::new();
        signal.stop();
        signal.stopped().await;
    }
}

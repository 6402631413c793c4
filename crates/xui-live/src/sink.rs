//! Outbound snapshot sinks

use crate::entity::Entity;
use crate::error::LiveSetError;
use crate::snapshot::Snapshot;
use tokio::sync::{mpsc, watch};

/// Consumer of settled live set states
pub trait SnapshotSink<E: Entity>: Send {
    /// Receive the materialized set after a change
    fn on_snapshot(&mut self, snapshot: Snapshot<E>);

    /// Receive a protocol or transport error
    ///
    /// The default implementation only logs.
    fn on_error(&mut self, error: &LiveSetError) {
        tracing::warn!(%error, "live set error");
    }
}

/// Item sent through a channel sink
#[derive(Debug, Clone)]
pub enum SinkEvent<E: Entity> {
    /// New snapshot
    Snapshot(Snapshot<E>),
    /// Error report
    Error(LiveSetError),
}

impl<E: Entity> SnapshotSink<E> for mpsc::UnboundedSender<SinkEvent<E>> {
    fn on_snapshot(&mut self, snapshot: Snapshot<E>) {
        if self.send(SinkEvent::Snapshot(snapshot)).is_err() {
            tracing::trace!("snapshot receiver dropped");
        }
    }

    fn on_error(&mut self, error: &LiveSetError) {
        if self.send(SinkEvent::Error(error.clone())).is_err() {
            tracing::trace!("error receiver dropped");
        }
    }
}

/// Latest-value sink: receivers only ever see the newest snapshot
///
/// The channel carries snapshots only. Errors are logged and never reach
/// receivers; a terminal error leaves the last snapshot in place. Use the
/// `mpsc` sink when errors must be observed.
impl<E: Entity> SnapshotSink<E> for watch::Sender<Snapshot<E>> {
    fn on_snapshot(&mut self, snapshot: Snapshot<E>) {
        self.send_replace(snapshot);
    }

    fn on_error(&mut self, error: &LiveSetError) {
        if error.is_terminal() {
            tracing::error!(
                %error,
                receivers = self.receiver_count(),
                "live set ended, watch keeps last snapshot"
            );
        } else {
            tracing::warn!(%error, "live set error");
        }
    }
}

//! XUI Live Sets
//!
//! An ordered, in-memory mirror of a remote collection, kept consistent by a
//! stream of delta messages.
//!
//! # Core Concepts
//!
//! - [`Entity`]: Record type with a unique identifier field
//! - [`DeltaMessage`]: Tagged `Ready`/`Added`/`Changed`/`Removed` message,
//!   decoded and validated at the wire boundary
//! - [`LiveSet`]: Synchronous state machine applying deltas in order
//! - [`Snapshot`]: Immutable ordered view pushed to a [`SnapshotSink`]
//! - [`LiveSubscription`]: Drives a [`LiveSet`] from an async stream
//!
//! # Notification contract
//!
//! - `Ready` always pushes the current snapshot, exactly once.
//! - `Added` before readiness accumulates silently unless
//!   [`NotificationPolicy::emit_before_ready`] is set.
//! - `Changed` pushes whenever the entity exists, ready or not.
//! - `Removed` pushes once ready if [`NotificationPolicy::emit_on_removed`]
//!   is set (the default).
//!
//! # Example
//!
//! ```rust,ignore
//! use xui_live::{Document, LiveSet, LiveSubscription, NotificationPolicy, SinkEvent};
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SinkEvent<Document>>();
//! let live = LiveSet::new(tx, NotificationPolicy::default());
//! let handle = LiveSubscription::spawn(live, transport_stream);
//!
//! while let Some(SinkEvent::Snapshot(snapshot)) = rx.recv().await {
//!     println!("{} documents", snapshot.len());
//! }
//! handle.stop();
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod entity;
mod error;
mod live_set;
mod message;
mod sink;
mod snapshot;
mod subscription;

pub use entity::{Document, DocumentId, Entity};
pub use error::{LiveSetError, ProtocolError, TransportError};
pub use live_set::{LiveSet, LiveSetEvents, NotificationPolicy, Phase};
pub use message::{DeltaKind, DeltaMessage};
pub use sink::{SinkEvent, SnapshotSink};
pub use snapshot::Snapshot;
pub use subscription::{LiveSubscription, StopSignal};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Live set state machine
//!
//! Applies [`DeltaMessage`]s in arrival order to an ordered set of entities
//! and pushes [`Snapshot`]s to a [`SnapshotSink`].
//!
//! # States
//!
//! ```text
//! NotReady --Ready--> Ready
//!    |                  |
//!    +------stop--------+--> Stopped
//! ```
//!
//! Entity existence is orthogonal: `Absent --Added--> Present --Removed--> Absent`.

use crate::entity::Entity;
use crate::error::{LiveSetError, ProtocolError, TransportError};
use crate::message::{DeltaKind, DeltaMessage};
use crate::sink::SnapshotSink;
use crate::snapshot::Snapshot;
use crate::subscription::StopSignal;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// When snapshots are pushed outside the always-push cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationPolicy {
    /// Push on `Added`/`Removed` before `Ready` arrives
    pub emit_before_ready: bool,
    /// Push on `Removed`
    pub emit_on_removed: bool,
}

impl NotificationPolicy {
    /// Create default policy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set pre-ready emission
    #[inline]
    #[must_use]
    pub fn with_emit_before_ready(mut self, enabled: bool) -> Self {
        self.emit_before_ready = enabled;
        self
    }

    /// Set emission on removal
    #[inline]
    #[must_use]
    pub fn with_emit_on_removed(mut self, enabled: bool) -> Self {
        self.emit_on_removed = enabled;
        self
    }
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            emit_before_ready: false,
            emit_on_removed: true,
        }
    }
}

/// Readiness phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Initial data still arriving
    NotReady,
    /// Initial data complete
    Ready,
    /// Detached; nothing is applied or delivered
    Stopped,
}

type ReadyFn = Box<dyn FnMut() + Send>;
type EntityFn<E> = Box<dyn FnMut(&E) + Send>;
type ChangedFn<E> = Box<dyn FnMut(&E, &Map<String, Value>, &E) + Send>;

/// Optional per-event callbacks
pub struct LiveSetEvents<E: Entity> {
    on_ready: Option<ReadyFn>,
    on_added: Option<EntityFn<E>>,
    on_changed: Option<ChangedFn<E>>,
    on_removed: Option<EntityFn<E>>,
}

impl<E: Entity> LiveSetEvents<E> {
    /// No callbacks
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            on_ready: None,
            on_added: None,
            on_changed: None,
            on_removed: None,
        }
    }

    /// Called once when the set becomes ready
    #[must_use]
    pub fn on_ready(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_ready = Some(Box::new(f));
        self
    }

    /// Called with each added entity
    #[must_use]
    pub fn on_added(mut self, f: impl FnMut(&E) + Send + 'static) -> Self {
        self.on_added = Some(Box::new(f));
        self
    }

    /// Called with (new entity, changed fields, previous entity)
    #[must_use]
    pub fn on_changed(mut self, f: impl FnMut(&E, &Map<String, Value>, &E) + Send + 'static) -> Self {
        self.on_changed = Some(Box::new(f));
        self
    }

    /// Called with each removed entity
    #[must_use]
    pub fn on_removed(mut self, f: impl FnMut(&E) + Send + 'static) -> Self {
        self.on_removed = Some(Box::new(f));
        self
    }
}

impl<E: Entity> Default for LiveSetEvents<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> fmt::Debug for LiveSetEvents<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSetEvents")
            .field("on_ready", &self.on_ready.is_some())
            .field("on_added", &self.on_added.is_some())
            .field("on_changed", &self.on_changed.is_some())
            .field("on_removed", &self.on_removed.is_some())
            .finish()
    }
}

/// Ordered in-memory mirror of a remote collection
///
/// # Invariants
/// - at most one entity per id
/// - stored entities are never mutated; a change replaces the `Arc`
/// - after stop, no callback runs and nothing reaches the sink
pub struct LiveSet<E: Entity, S: SnapshotSink<E>> {
    items: im::Vector<Arc<E>>,
    ready: bool,
    policy: NotificationPolicy,
    events: LiveSetEvents<E>,
    sink: S,
    stop: StopSignal,
}

impl<E: Entity, S: SnapshotSink<E>> LiveSet<E, S> {
    /// Create live set without callbacks
    #[must_use]
    pub fn new(sink: S, policy: NotificationPolicy) -> Self {
        Self::with_events(sink, policy, LiveSetEvents::new())
    }

    /// Create live set with callbacks
    #[must_use]
    pub fn with_events(sink: S, policy: NotificationPolicy, events: LiveSetEvents<E>) -> Self {
        Self {
            items: im::Vector::new(),
            ready: false,
            policy,
            events,
            sink,
            stop: StopSignal::new(),
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.stop.is_stopped() {
            Phase::Stopped
        } else if self.ready {
            Phase::Ready
        } else {
            Phase::NotReady
        }
    }

    /// Check if `Ready` has been applied
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Check if stopped
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Number of entities
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entity by id
    #[must_use]
    pub fn get(&self, id: &E::Id) -> Option<&E> {
        self.position(id).and_then(|i| self.items.get(i)).map(|e| &**e)
    }

    /// Current contents
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<E> {
        Snapshot::new(self.items.clone())
    }

    /// Notification policy
    #[inline]
    #[must_use]
    pub fn policy(&self) -> NotificationPolicy {
        self.policy
    }

    /// The sink
    #[inline]
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Handle that stops this live set from another task
    #[inline]
    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Detach; idempotent
    ///
    /// Returns `true` if this call performed the stop.
    pub fn stop(&mut self) -> bool {
        let stopped = self.stop.stop();
        if stopped {
            tracing::debug!(entities = self.items.len(), "live set stopped");
        }
        stopped
    }

    /// Apply a validated message
    ///
    /// Messages arriving after stop are ignored.
    ///
    /// # Errors
    /// - [`ProtocolError::UnknownEntity`] for `Changed`/`Removed` with an id
    ///   that is not present; the set is left unchanged
    /// - [`ProtocolError::MalformedPayload`] if a change cannot be merged into
    ///   the stored entity
    pub fn apply(&mut self, message: DeltaMessage<E>) -> Result<(), ProtocolError> {
        if self.is_stopped() {
            tracing::trace!(kind = %message.kind(), "message after stop ignored");
            return Ok(());
        }

        match message {
            DeltaMessage::Ready => {
                self.mark_ready();
                Ok(())
            }
            DeltaMessage::Added(entity) => {
                self.add(entity);
                Ok(())
            }
            DeltaMessage::Changed { id, fields } => self.change(&id, fields),
            DeltaMessage::Removed { id } => self.remove(&id),
        }
    }

    /// Decode and apply a raw transport item
    ///
    /// Protocol errors go to the sink's error channel; processing continues.
    pub fn handle(&mut self, raw: Value) {
        let result = DeltaMessage::decode(raw).and_then(|message| self.apply(message));
        if let Err(error) = result {
            tracing::warn!(%error, "delta rejected");
            self.report(&LiveSetError::Protocol(error));
        }
    }

    /// Terminate after an inbound stream failure
    pub fn fail(&mut self, error: TransportError) {
        if self.is_stopped() {
            return;
        }
        tracing::error!(%error, "live set transport failed");
        self.report(&LiveSetError::Transport(error));
        self.stop();
    }

    fn mark_ready(&mut self) {
        if self.ready {
            tracing::debug!("duplicate ready ignored");
            return;
        }
        self.ready = true;
        tracing::debug!(entities = self.items.len(), "live set ready");

        if let Some(on_ready) = self.events.on_ready.as_mut() {
            if !self.stop.is_stopped() {
                on_ready();
            }
        }
        self.emit();
    }

    fn add(&mut self, entity: E) {
        let entity = Arc::new(entity);
        match self.position(entity.id()) {
            Some(index) => {
                tracing::warn!(id = ?entity.id(), "added entity already present, replacing");
                self.items.set(index, Arc::clone(&entity));
            }
            None => self.items.push_back(Arc::clone(&entity)),
        }

        if let Some(on_added) = self.events.on_added.as_mut() {
            if !self.stop.is_stopped() {
                on_added(&entity);
            }
        }
        if self.ready || self.policy.emit_before_ready {
            self.emit();
        }
    }

    fn change(&mut self, id: &E::Id, fields: Map<String, Value>) -> Result<(), ProtocolError> {
        let index = self.position(id).ok_or_else(|| ProtocolError::UnknownEntity {
            kind: DeltaKind::Changed,
            id: format!("{id:?}"),
        })?;
        let previous = Arc::clone(&self.items[index]);
        let next = Arc::new(merge(previous.as_ref(), &fields)?);

        self.items.set(index, Arc::clone(&next));
        self.emit();

        if let Some(on_changed) = self.events.on_changed.as_mut() {
            if !self.stop.is_stopped() {
                on_changed(&next, &fields, &previous);
            }
        }
        Ok(())
    }

    fn remove(&mut self, id: &E::Id) -> Result<(), ProtocolError> {
        let index = self.position(id).ok_or_else(|| ProtocolError::UnknownEntity {
            kind: DeltaKind::Removed,
            id: format!("{id:?}"),
        })?;
        let removed = self.items.remove(index);

        if let Some(on_removed) = self.events.on_removed.as_mut() {
            if !self.stop.is_stopped() {
                on_removed(&removed);
            }
        }
        if (self.ready || self.policy.emit_before_ready) && self.policy.emit_on_removed {
            self.emit();
        }
        Ok(())
    }

    fn emit(&mut self) {
        if self.stop.is_stopped() {
            return;
        }
        let snapshot = self.snapshot();
        self.sink.on_snapshot(snapshot);
    }

    fn report(&mut self, error: &LiveSetError) {
        if !self.stop.is_stopped() {
            self.sink.on_error(error);
        }
    }

    fn position(&self, id: &E::Id) -> Option<usize> {
        self.items.iter().position(|e| e.id() == id)
    }
}

impl<E: Entity, S: SnapshotSink<E>> fmt::Debug for LiveSet<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSet")
            .field("phase", &self.phase())
            .field("len", &self.items.len())
            .field("policy", &self.policy)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// Overlay changed fields on a copy of `previous`
fn merge<E: Entity>(previous: &E, fields: &Map<String, Value>) -> Result<E, ProtocolError> {
    let mut document = match serde_json::to_value(previous) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(ProtocolError::malformed(
                DeltaKind::Changed,
                format!("entity does not serialize to an object: {other}"),
            ))
        }
        Err(e) => return Err(ProtocolError::malformed(DeltaKind::Changed, e)),
    };

    for (key, value) in fields {
        if key != E::ID_FIELD {
            document.insert(key.clone(), value.clone());
        }
    }

    serde_json::from_value(Value::Object(document)).map_err(|e| ProtocolError::malformed(DeltaKind::Changed, e))
}

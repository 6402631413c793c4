//! Testing utilities for XUI workspace
//!
//! Shared fixtures: a typed entity, a recording sink, instrumented
//! side-stores and wire message builders.

#![allow(missing_docs)]
#![allow(clippy::must_use_candidate)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use xui_live::{Entity, LiveSetError, Snapshot, SnapshotSink};
use xui_session::{MemorySideStore, PersistenceError, SideStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub done: bool,
}

impl Todo {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            done: false,
        }
    }
}

impl Entity for Todo {
    type Id = String;

    fn id(&self) -> &String {
        &self.id
    }
}

struct Recorded<E: Entity> {
    snapshots: Vec<Snapshot<E>>,
    errors: Vec<LiveSetError>,
}

/// Sink keeping every delivery; clones share the same record
pub struct RecordingSink<E: Entity> {
    recorded: Arc<Mutex<Recorded<E>>>,
}

impl<E: Entity> RecordingSink<E> {
    pub fn new() -> Self {
        Self {
            recorded: Arc::new(Mutex::new(Recorded {
                snapshots: Vec::new(),
                errors: Vec::new(),
            })),
        }
    }

    pub fn snapshots(&self) -> Vec<Snapshot<E>> {
        self.recorded.lock().snapshots.clone()
    }

    pub fn snapshot_count(&self) -> usize {
        self.recorded.lock().snapshots.len()
    }

    pub fn last(&self) -> Option<Snapshot<E>> {
        self.recorded.lock().snapshots.last().cloned()
    }

    pub fn errors(&self) -> Vec<LiveSetError> {
        self.recorded.lock().errors.clone()
    }
}

impl<E: Entity> Clone for RecordingSink<E> {
    fn clone(&self) -> Self {
        Self {
            recorded: Arc::clone(&self.recorded),
        }
    }
}

impl<E: Entity> Default for RecordingSink<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> SnapshotSink<E> for RecordingSink<E> {
    fn on_snapshot(&mut self, snapshot: Snapshot<E>) {
        self.recorded.lock().snapshots.push(snapshot);
    }

    fn on_error(&mut self, error: &LiveSetError) {
        self.recorded.lock().errors.push(error.clone());
    }
}

/// Memory side-store that counts reads and writes
#[derive(Debug, Default)]
pub struct CountingSideStore {
    inner: MemorySideStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingSideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    pub fn stored(&self, key: &str) -> Option<Value> {
        self.raw(key).and_then(|raw| serde_json::from_str(&raw).ok())
    }

    pub fn seed(&self, key: &str, value: &Value) {
        self.inner.insert(key, value.to_string());
    }
}

#[async_trait]
impl SideStore for CountingSideStore {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.inner.remove(key).await
    }
}

/// Side-store whose writes always fail
#[derive(Debug, Default)]
pub struct FailingSideStore {
    fail_reads: bool,
}

impl FailingSideStore {
    /// Reads succeed empty, writes fail
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads fail too
    pub fn unreadable() -> Self {
        Self { fail_reads: true }
    }
}

#[async_trait]
impl SideStore for FailingSideStore {
    async fn read(&self, _key: &str) -> Result<Option<String>, PersistenceError> {
        if self.fail_reads {
            Err(PersistenceError::Backend("read refused".to_string()))
        } else {
            Ok(None)
        }
    }

    async fn write(&self, _key: &str, _value: String) -> Result<(), PersistenceError> {
        Err(PersistenceError::Backend("disk full".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), PersistenceError> {
        Err(PersistenceError::Backend("remove refused".to_string()))
    }
}

pub fn ready() -> Value {
    json!({ "event": "ready" })
}

pub fn added(document: Value) -> Value {
    json!({ "event": "added", "document": document })
}

pub fn added_todo(id: &str, title: &str) -> Value {
    added(json!({ "_id": id, "title": title }))
}

pub fn changed(id: &str, fields: Value) -> Value {
    let mut document = match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    document.insert("_id".to_string(), json!(id));
    json!({ "event": "changed", "document": document })
}

pub fn removed(id: &str) -> Value {
    json!({ "event": "removed", "document": { "_id": id } })
}

//! Integration tests for the reactive session store

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use xui_session::{
    ConfigurationError, FieldChange, FileSideStore, MemorySideStore, PersistenceError, ReactiveStore,
    SessionSchema, SetOptions, SideStore, StoreError, DEFAULT_STORAGE_KEY,
};
use xui_test_utils::{CountingSideStore, FailingSideStore};

fn schema() -> SessionSchema {
    SessionSchema::builder()
        .field("lastAuthenticationTime", 0)
        .field("theme", "light")
        .field("sidebarOpen", true)
        .build()
}

#[tokio::test]
async fn test_plain_set_does_not_touch_side_store() {
    let side = Arc::new(CountingSideStore::new());
    let store = ReactiveStore::open(schema(), side.clone(), DEFAULT_STORAGE_KEY).await;

    store.set("lastAuthenticationTime", 12345, SetOptions::default()).await.unwrap();

    assert_eq!(store.get("lastAuthenticationTime").unwrap(), json!(12345));
    assert_eq!(side.writes(), 0);
}

#[tokio::test]
async fn test_handler_accumulates() {
    let store = ReactiveStore::new(schema());
    store.set("lastAuthenticationTime", 100, SetOptions::default()).await.unwrap();
    store
        .on_set("lastAuthenticationTime", |prev, next| {
            json!(prev.as_i64().unwrap_or(0) + next.as_i64().unwrap_or(0))
        })
        .unwrap();

    store.set("lastAuthenticationTime", 50, SetOptions::default()).await.unwrap();

    assert_eq!(store.get("lastAuthenticationTime").unwrap(), json!(150));
}

#[tokio::test]
async fn test_listener_sees_committed_value() {
    let store = ReactiveStore::new(schema());
    store.on_set("theme", |_, next| json!(next.as_str().unwrap_or("").to_uppercase())).unwrap();
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let reader = store.clone();
    let _sub = store
        .subscribe("theme", move |change| {
            sink.lock().push((change.value.clone(), reader.get("theme").unwrap()));
        })
        .unwrap();

    store.set("theme", "dark", SetOptions::default()).await.unwrap();

    assert_eq!(*seen.lock(), vec![(json!("DARK"), json!("DARK"))]);
}

#[tokio::test]
async fn test_duplicate_handler_leaves_store_untouched() {
    let store = ReactiveStore::new(schema());
    store.on_set("theme", |_, next| next.clone()).unwrap();
    let before = store.snapshot();

    let err = store.on_set("theme", |_, _| json!("hijacked")).unwrap_err();
    store.set("theme", "dark", SetOptions::default()).await.unwrap();

    assert!(matches!(
        err,
        StoreError::Configuration(ConfigurationError::DuplicateHandler(_))
    ));
    assert_eq!(before.get("theme"), Some(&json!("light")));
    assert_eq!(store.get("theme").unwrap(), json!("dark"));
}

#[tokio::test]
async fn test_persisted_values_survive_reopen() {
    let side = Arc::new(CountingSideStore::new());
    let store = ReactiveStore::open(schema(), side.clone(), DEFAULT_STORAGE_KEY).await;
    store.set("theme", "dark", SetOptions::persist()).await.unwrap();
    store.set("sidebarOpen", false, SetOptions::default()).await.unwrap();
    assert_eq!(side.writes(), 1);

    let reopened = ReactiveStore::open(schema(), side.clone(), DEFAULT_STORAGE_KEY).await;

    assert_eq!(reopened.get("theme").unwrap(), json!("dark"));
    assert_eq!(reopened.get("sidebarOpen").unwrap(), json!(true));
    assert_eq!(reopened.get("lastAuthenticationTime").unwrap(), json!(0));
}

#[tokio::test]
async fn test_malformed_persisted_data_falls_back_to_defaults() {
    let side = Arc::new(CountingSideStore::new());
    side.seed(DEFAULT_STORAGE_KEY, &json!("not an object"));

    let store = ReactiveStore::open(schema(), side.clone(), DEFAULT_STORAGE_KEY).await;

    assert_eq!(store.get("theme").unwrap(), json!("light"));
    store.set("theme", "dark", SetOptions::persist()).await.unwrap();
    assert_eq!(side.stored(DEFAULT_STORAGE_KEY), Some(json!({"theme": "dark"})));
}

#[tokio::test]
async fn test_unreadable_side_store_opens_with_defaults() {
    let store = ReactiveStore::open(schema(), Arc::new(FailingSideStore::unreadable()), "s").await;
    assert_eq!(store.get("theme").unwrap(), json!("light"));

    let err = store.set("theme", "dark", SetOptions::persist()).await.unwrap_err();
    assert!(err.is_persistence());
    assert_eq!(store.get("theme").unwrap(), json!("dark"));
}

#[tokio::test]
async fn test_failed_write_is_reported_after_commit() {
    let store = ReactiveStore::open(schema(), Arc::new(FailingSideStore::new()), "s").await;
    let notified = Arc::new(parking_lot::Mutex::new(0));
    let count = Arc::clone(&notified);
    let _sub = store.subscribe("theme", move |_| *count.lock() += 1).unwrap();

    let err = store.set("theme", "dark", SetOptions::persist()).await.unwrap_err();

    assert!(matches!(err, StoreError::Persistence(PersistenceError::Backend(_))));
    assert_eq!(store.get("theme").unwrap(), json!("dark"));
    assert_eq!(*notified.lock(), 1);
}

#[tokio::test]
async fn test_file_side_store_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let side = Arc::new(FileSideStore::new(dir.path()));

    let store = ReactiveStore::open(schema(), side.clone(), DEFAULT_STORAGE_KEY).await;
    store.set("lastAuthenticationTime", 99, SetOptions::persist()).await.unwrap();
    drop(store);

    let reopened = ReactiveStore::open(schema(), side, DEFAULT_STORAGE_KEY).await;
    assert_eq!(reopened.get_as::<u64>("lastAuthenticationTime").unwrap(), 99);

    let on_disk: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("xui-session.json")).unwrap())
            .unwrap();
    assert_eq!(on_disk, json!({"lastAuthenticationTime": 99}));
}

/// Memory side-store that gives other tasks a turn between read and write
#[derive(Debug)]
struct YieldingSideStore {
    inner: MemorySideStore,
}

impl YieldingSideStore {
    fn new() -> Self {
        Self {
            inner: MemorySideStore::new(),
        }
    }

    fn stored(&self, key: &str) -> Option<Value> {
        self.inner.get(key).map(|raw| serde_json::from_str(&raw).unwrap())
    }
}

#[async_trait]
impl SideStore for YieldingSideStore {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value = self.inner.read(key).await?;
        tokio::task::yield_now().await;
        Ok(value)
    }

    async fn write(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.inner.write(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.inner.remove(key).await
    }
}

#[tokio::test]
async fn test_overlapping_persisting_sets_keep_every_field() {
    let side = Arc::new(YieldingSideStore::new());
    let store = ReactiveStore::open(schema(), side.clone(), DEFAULT_STORAGE_KEY).await;

    let (stamp, theme) = tokio::join!(
        store.set("lastAuthenticationTime", 1, SetOptions::persist()),
        store.set("theme", "dark", SetOptions::persist()),
    );
    stamp.unwrap();
    theme.unwrap();

    assert_eq!(
        side.stored(DEFAULT_STORAGE_KEY),
        Some(json!({"lastAuthenticationTime": 1, "theme": "dark"}))
    );
    let reopened = ReactiveStore::open(schema(), side, DEFAULT_STORAGE_KEY).await;
    assert_eq!(reopened.get("lastAuthenticationTime").unwrap(), json!(1));
    assert_eq!(reopened.get("theme").unwrap(), json!("dark"));
}

#[tokio::test]
async fn test_overlapping_sets_of_one_field_reach_disk_in_commit_order() {
    let side = Arc::new(YieldingSideStore::new());
    let store = ReactiveStore::open(schema(), side.clone(), DEFAULT_STORAGE_KEY).await;

    let (first, second) = tokio::join!(
        store.set("theme", "dark", SetOptions::persist()),
        store.set("theme", "dim", SetOptions::persist()),
    );
    first.unwrap();
    second.unwrap();

    let in_memory = store.get("theme").unwrap();
    assert_eq!(side.stored(DEFAULT_STORAGE_KEY), Some(json!({"theme": in_memory})));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accumulating_sets_lose_nothing() {
    let store = ReactiveStore::new(schema());
    store
        .on_set_typed::<i64, _>("lastAuthenticationTime", |prev, next| prev + next)
        .unwrap();
    let changes = Arc::new(parking_lot::Mutex::new(Vec::<FieldChange>::new()));
    let sink = Arc::clone(&changes);
    let _sub = store
        .subscribe("lastAuthenticationTime", move |change| sink.lock().push(change.clone()))
        .unwrap();

    let tasks: Vec<_> = (0..64)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .set("lastAuthenticationTime", 1, SetOptions::default())
                    .await
                    .unwrap()
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.get_as::<i64>("lastAuthenticationTime").unwrap(), 64);
    let changes = changes.lock();
    assert_eq!(changes.len(), 64);
    for change in changes.iter() {
        let previous = change.previous_value.as_i64().unwrap();
        assert_eq!(change.value, json!(previous + 1));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bindings_made_during_sets_end_current() {
    let store = ReactiveStore::new(schema());
    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for n in 1..=200 {
                store
                    .set("lastAuthenticationTime", n, SetOptions::default())
                    .await
                    .unwrap();
            }
        })
    };

    let mut bindings = Vec::new();
    while !writer.is_finished() {
        bindings.push(store.bind("lastAuthenticationTime").unwrap());
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
    bindings.push(store.bind("lastAuthenticationTime").unwrap());

    for binding in &bindings {
        assert_eq!(binding.get(), json!(200));
    }
}

proptest! {
    #[test]
    fn prop_get_returns_last_committed(values in prop::collection::vec(any::<i64>(), 1..20)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let store = ReactiveStore::new(schema());
            for v in &values {
                let committed = store.set("lastAuthenticationTime", *v, SetOptions::default()).await.unwrap();
                assert_eq!(store.get("lastAuthenticationTime").unwrap(), committed);
            }
            assert_eq!(store.get("lastAuthenticationTime").unwrap(), json!(values[values.len() - 1]));
        });
    }

    #[test]
    fn prop_persisted_reopen_matches(theme in "[a-z]{1,12}", stamp in any::<u32>()) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let side = Arc::new(CountingSideStore::new());
            let store = ReactiveStore::open(schema(), side.clone(), "p").await;
            store.set("theme", theme.as_str(), SetOptions::persist()).await.unwrap();
            store.set("lastAuthenticationTime", stamp, SetOptions::persist()).await.unwrap();

            let reopened = ReactiveStore::open(schema(), side, "p").await;
            assert_eq!(reopened.get("theme").unwrap(), json!(theme));
            assert_eq!(reopened.get("lastAuthenticationTime").unwrap(), json!(stamp));
            assert_eq!(reopened.get("sidebarOpen").unwrap(), json!(true));
        });
    }
}

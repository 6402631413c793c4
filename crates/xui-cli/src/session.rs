//! Inspect and edit the persisted session

use crate::config::XuiConfig;
use anyhow::Context;
use serde_json::{Map, Value};
use std::sync::Arc;
use xui_session::{FileSideStore, ReactiveStore, SetOptions};

/// Open the session store described by `config`
pub async fn open_store(config: &XuiConfig) -> ReactiveStore {
    let side_store = Arc::new(FileSideStore::new(&config.session.storage_dir));
    ReactiveStore::open(config.schema(), side_store, config.session.storage_key.clone()).await
}

/// Parse a value given on the command line
///
/// Anything that is not valid JSON is taken as a plain string, so
/// `xui session set theme dark` works without quoting.
#[must_use]
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Current value of one field
///
/// # Errors
/// Fails for fields outside the configured defaults
pub fn get(store: &ReactiveStore, key: &str) -> anyhow::Result<Value> {
    store.get(key).with_context(|| format!("reading field '{key}'"))
}

/// Set and persist one field, returning the committed value
///
/// # Errors
/// Fails for unknown fields or if the side-store write fails
pub async fn set(store: &ReactiveStore, key: &str, raw: &str) -> anyhow::Result<Value> {
    store
        .set(key, parse_value(raw), SetOptions::persist())
        .await
        .with_context(|| format!("setting field '{key}'"))
}

/// Every field, as one JSON object with sorted keys
#[must_use]
pub fn show(store: &ReactiveStore) -> Value {
    let mut fields: Vec<(String, Value)> = store.snapshot().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    Value::Object(fields.into_iter().collect::<Map<String, Value>>())
}

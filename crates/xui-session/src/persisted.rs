//! Persisted session mapping
//!
//! The side-store holds one flat JSON object under the storage key. Reads
//! fail soft; writes merge one field into whatever is already stored.

use crate::error::PersistenceError;
use crate::side_store::SideStore;
use serde_json::{Map, Value};

/// Read the persisted mapping
///
/// Missing, unreadable, or malformed data yields an empty mapping; the
/// failure is logged and never propagated.
pub async fn load_persisted(store: &dyn SideStore, storage_key: &str) -> Map<String, Value> {
    match read_mapping(store, storage_key).await {
        Ok(map) => map,
        Err(error) => {
            tracing::warn!(%error, storage_key, "persisted session unreadable, using defaults");
            Map::new()
        }
    }
}

/// Malformed content reads as empty; only side-store failures are errors.
async fn read_mapping(store: &dyn SideStore, storage_key: &str) -> Result<Map<String, Value>, PersistenceError> {
    let Some(raw) = store.read(storage_key).await? else {
        return Ok(Map::new());
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => {
            tracing::warn!(storage_key, kind = json_kind(&other), "persisted session is not an object, discarding");
            Ok(Map::new())
        }
        Err(error) => {
            tracing::warn!(%error, storage_key, "persisted session malformed, discarding");
            Ok(Map::new())
        }
    }
}

/// Write one field into the persisted mapping, keeping the other keys
///
/// # Errors
/// Returns the side-store's error if reading the current mapping or the
/// write fails; nothing is written when the read fails
pub async fn merge_persisted(
    store: &dyn SideStore,
    storage_key: &str,
    key: &str,
    value: &Value,
) -> Result<(), PersistenceError> {
    let mut persisted = read_mapping(store, storage_key).await?;
    persisted.insert(key.to_string(), value.clone());

    let encoded = serde_json::to_string(&Value::Object(persisted))
        .map_err(|e| PersistenceError::Serialize(e.to_string()))?;
    store.write(storage_key, encoded).await
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

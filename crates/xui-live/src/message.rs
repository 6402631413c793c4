//! Delta messages and wire decoding
//!
//! Wire shape, one message per transport item:
//!
//! ```json
//! { "event": "added", "document": { "_id": "a", "title": "..." } }
//! ```
//!
//! `document` may also be a JSON-encoded string. A GraphQL subscription
//! envelope `{ "data": { "<field>": <message> } }` is unwrapped first.

use crate::entity::Entity;
use crate::error::ProtocolError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// Kind of a delta message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaKind {
    /// Initial data set fully delivered
    Ready,
    /// Entity entered the set
    Added,
    /// Fields of an entity changed
    Changed,
    /// Entity left the set
    Removed,
}

impl DeltaKind {
    /// Parse wire name, case-insensitively
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        [Self::Ready, Self::Added, Self::Changed, Self::Removed]
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Added => "added",
            Self::Changed => "changed",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated delta message for entity type `E`
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaMessage<E: Entity> {
    /// Initial data set fully delivered
    Ready,
    /// Entity entered the set
    Added(E),
    /// Fields of an entity changed
    Changed {
        /// Target entity
        id: E::Id,
        /// Changed fields, without the id
        fields: Map<String, Value>,
    },
    /// Entity left the set
    Removed {
        /// Target entity
        id: E::Id,
    },
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    event: String,
    #[serde(default)]
    document: Option<Value>,
}

impl<E: Entity> DeltaMessage<E> {
    /// Message kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> DeltaKind {
        match self {
            Self::Ready => DeltaKind::Ready,
            Self::Added(_) => DeltaKind::Added,
            Self::Changed { .. } => DeltaKind::Changed,
            Self::Removed { .. } => DeltaKind::Removed,
        }
    }

    /// Decode a raw transport item
    ///
    /// # Errors
    /// - [`ProtocolError::MalformedEnvelope`] if the item has no event
    /// - [`ProtocolError::UnknownKind`] for unrecognized event names
    /// - [`ProtocolError::MalformedPayload`] if the document does not match
    ///   the message kind
    pub fn decode(raw: Value) -> Result<Self, ProtocolError> {
        let wire: WireMessage = serde_json::from_value(unwrap_envelope(raw)?)
            .map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))?;

        let kind = DeltaKind::from_wire(&wire.event)
            .ok_or_else(|| ProtocolError::UnknownKind(wire.event.clone()))?;

        match kind {
            DeltaKind::Ready => Ok(Self::Ready),
            DeltaKind::Added => {
                let document = parse_document(kind, wire.document)?;
                serde_json::from_value(Value::Object(document))
                    .map(Self::Added)
                    .map_err(|e| ProtocolError::malformed(kind, e))
            }
            DeltaKind::Changed => {
                let document = parse_document(kind, wire.document)?;
                let (id, fields) = split_id::<E>(kind, document)?;
                Ok(Self::Changed { id, fields })
            }
            DeltaKind::Removed => {
                let document = parse_document(kind, wire.document)?;
                let (id, _) = split_id::<E>(kind, document)?;
                Ok(Self::Removed { id })
            }
        }
    }
}

fn unwrap_envelope(raw: Value) -> Result<Value, ProtocolError> {
    match raw {
        Value::Object(mut map) if !map.contains_key("event") && map.contains_key("data") => {
            match map.remove("data") {
                Some(Value::Object(data)) => data.into_iter().next().map(|(_, v)| v).ok_or_else(
                    || ProtocolError::MalformedEnvelope("empty subscription data".to_string()),
                ),
                _ => Err(ProtocolError::MalformedEnvelope(
                    "subscription data is not an object".to_string(),
                )),
            }
        }
        other => Ok(other),
    }
}

fn parse_document(kind: DeltaKind, document: Option<Value>) -> Result<Map<String, Value>, ProtocolError> {
    let document = match document {
        Some(Value::String(encoded)) => {
            serde_json::from_str(&encoded).map_err(|e| ProtocolError::malformed(kind, e))?
        }
        Some(value) => value,
        None => return Err(ProtocolError::malformed(kind, "missing document")),
    };

    match document {
        Value::Object(map) => Ok(map),
        other => Err(ProtocolError::malformed(
            kind,
            format!("document must be an object, got {other}"),
        )),
    }
}

fn split_id<E: Entity>(
    kind: DeltaKind,
    mut document: Map<String, Value>,
) -> Result<(E::Id, Map<String, Value>), ProtocolError> {
    let raw_id = document
        .remove(E::ID_FIELD)
        .ok_or_else(|| ProtocolError::malformed(kind, format!("missing `{}`", E::ID_FIELD)))?;
    let id = serde_json::from_value(raw_id).map_err(|e| ProtocolError::malformed(kind, e))?;
    Ok((id, document))
}

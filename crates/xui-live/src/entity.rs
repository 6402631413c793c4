//! Entity trait and the generic JSON document entity

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt::{self, Debug};

/// Record type mirrored by a [`LiveSet`](crate::LiveSet)
///
/// # Invariants
/// - `id()` is stable for the lifetime of the record
/// - the serialized form is a JSON object carrying the id under
///   [`Entity::ID_FIELD`]
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Identifier type, compared for equality only
    type Id: Clone + Eq + Debug + DeserializeOwned + Send + Sync + 'static;

    /// Name of the identifier field on the wire
    const ID_FIELD: &'static str = "_id";

    /// Identifier of this record
    fn id(&self) -> &Self::Id;
}

/// Identifier of a schemaless [`Document`]
///
/// Accepts strings, numbers and `{"$oid": "..."}` object ids on the wire and
/// normalizes them to their string form, so `1`, `"1"` and `{"$oid": "1"}`
/// name the same document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create id from its string form
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// String form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(id) => Ok(Self(id)),
            Value::Number(n) => Ok(Self(n.to_string())),
            Value::Object(map) => match map.get("$oid") {
                Some(Value::String(id)) => Ok(Self(id.clone())),
                _ => Err(D::Error::custom("object id must carry a string `$oid`")),
            },
            other => Err(D::Error::custom(format!("unsupported document id: {other}"))),
        }
    }
}

/// Schemaless document: an id plus arbitrary JSON fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    id: DocumentId,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Document {
    /// Create document with no payload fields
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Add a payload field
    #[inline]
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Payload field by name
    #[inline]
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All payload fields
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl Entity for Document {
    type Id = DocumentId;

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

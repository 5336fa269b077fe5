//! Document and write-payload types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use common::DocumentId;

use crate::error::{Result, StoreError};

/// The field map of a stored document.
pub type FieldMap = serde_json::Map<String, Value>;

/// A document read back from the store: its id plus a schemaless field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The document's id within its collection.
    pub id: DocumentId,

    /// The document's fields.
    pub fields: FieldMap,
}

impl Document {
    /// Creates a document from an id and field map.
    pub fn new(id: DocumentId, fields: FieldMap) -> Self {
        Self { id, fields }
    }

    /// Returns a field's raw value, if present.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns true if the document carries the named field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Deserializes a field into a typed value.
    ///
    /// Returns `Ok(None)` if the field is absent, and a serialization error
    /// if it is present but malformed.
    pub fn parse_field<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.fields.get(name) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }
}

/// A value to be written to a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteValue {
    /// A literal JSON value.
    Value(Value),

    /// A sentinel resolved by the store to its clock at write time.
    ServerTimestamp,
}

/// An ordered set of field writes.
///
/// Built by callers and handed to the store, which resolves any
/// [`WriteValue::ServerTimestamp`] sentinels before persisting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteFields {
    entries: BTreeMap<String, WriteValue>,
}

impl WriteFields {
    /// Creates an empty write set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field to a literal JSON value.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(name.into(), WriteValue::Value(value.into()));
        self
    }

    /// Serializes a typed value into a field.
    pub fn set_serialized<T: serde::Serialize + ?Sized>(
        self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self> {
        let json = serde_json::to_value(value)?;
        Ok(self.set(name, json))
    }

    /// Marks a field to receive the store's timestamp at write time.
    pub fn server_timestamp(mut self, name: impl Into<String>) -> Self {
        self.entries.insert(name.into(), WriteValue::ServerTimestamp);
        self
    }

    /// Returns true if no fields are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of fields set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Resolves the write set into a plain field map, substituting server
    /// timestamps with the given instant (RFC 3339).
    pub fn resolve_at(self, now: DateTime<Utc>) -> FieldMap {
        let mut fields = FieldMap::new();
        for (name, value) in self.entries {
            let resolved = match value {
                WriteValue::Value(v) => v,
                WriteValue::ServerTimestamp => Value::String(now.to_rfc3339()),
            };
            fields.insert(name, resolved);
        }
        fields
    }
}

/// Parses a stored server timestamp back into a typed instant.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>> {
    let raw = value.as_str().ok_or_else(|| {
        StoreError::Unavailable("timestamp field is not a string".to_string())
    })?;
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| StoreError::Unavailable(format!("malformed timestamp: {}", e)))?;
    Ok(parsed.with_timezone(&Utc))
}

//! # Record
//! Records are the basic unit of the attendance list. A record is a bag of named fields with a
//! `type` that says which collection it belongs to, and an `id` once the database has a key for it.
//! The fields themselves are opaque to this library: whatever the app puts in is written to the
//! database unchanged.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::SyncError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub record_type: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Characters the database refuses in keys. `/` would also make an id address a parent node.
const FORBIDDEN_ID_CHARS: &[char] = &['/', '.', '#', '$', '[', ']'];

/// Records saved by older app versions sometimes used numeric ids (e.g. `Date.now()`).
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl Record {
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            id: None,
            record_type: record_type.into(),
            fields: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Rebuilds a record from a value stored at `key`. The key always wins over any `id` in
    /// the payload, and `default_type` fills in a missing or non-string `type`.
    pub fn from_stored(key: &str, default_type: &str, value: &Value) -> Option<Self> {
        let mut object = value.as_object()?.clone();
        if !object.get("type").is_some_and(Value::is_string) {
            object.remove("type");
        }
        let mut record = serde_json::from_value::<Record>(Value::Object(object))
            .inspect_err(|e| log::warn!("Skipping unreadable record at {key}: {e}"))
            .ok()?;
        record.id = Some(key.to_string());
        if record.record_type.is_empty() {
            record.record_type = default_type.to_string();
        }
        Some(record)
    }

    /// What gets written to the database: every field plus `type`, never `id`.
    pub fn payload(&self) -> Value {
        let mut payload = self.fields.clone();
        payload.remove("id");
        payload.insert("type".to_string(), Value::String(self.record_type.clone()));
        Value::Object(payload)
    }

    pub fn require_type(&self) -> Result<&str, SyncError> {
        if self.record_type.trim().is_empty() {
            return Err(SyncError::InvalidRecord("record has no type".to_string()));
        }
        Ok(&self.record_type)
    }

    /// The id must name exactly one entry of its collection.
    pub fn require_id(&self) -> Result<&str, SyncError> {
        match self.id.as_deref() {
            Some(id) if id.trim().is_empty() => {
                Err(SyncError::InvalidRecord("record has no id".to_string()))
            }
            Some(id) if id.contains(FORBIDDEN_ID_CHARS) => Err(SyncError::InvalidRecord(format!(
                "record id {id:?} is not a valid key"
            ))),
            Some(id) => Ok(id),
            None => Err(SyncError::InvalidRecord("record has no id".to_string())),
        }
    }
}

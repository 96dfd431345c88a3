//! # Schema
//! The database is split into collections, and each record type lives in exactly one of them.
//! A collection is either a singleton (one record at a fixed key) or keyed (many records, each
//! under a key the database generates). Everything that needs to know where a record goes
//! (writes, the migration, building the flattened list) looks it up here instead of hardcoding
//! paths per type.

use crate::path;

use super::{ATTENDANCE_TYPE, DEFAULT_SETTINGS_ID, SETTINGS_TYPE};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionKind {
    Singleton { key: String },
    Keyed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionSpec {
    pub record_type: String,
    /// Relative to the store's root path.
    pub path: String,
    pub kind: CollectionKind,
}

/// Where `create` writes a new record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreateTarget {
    /// Overwrite the value at this path; the record's id is the last segment.
    Overwrite { path: String, id: String },
    /// Append under this path with a generated key.
    Append { path: String },
}

impl CollectionSpec {
    pub fn singleton(
        record_type: impl Into<String>,
        path: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            path: path.into(),
            kind: CollectionKind::Singleton { key: key.into() },
        }
    }

    pub fn keyed(record_type: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            path: path.into(),
            kind: CollectionKind::Keyed,
        }
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self.kind, CollectionKind::Singleton { .. })
    }

    /// Location of an existing record in this collection.
    pub fn record_path(&self, id: &str) -> String {
        path::join(&self.path, id)
    }

    pub fn create_target(&self) -> CreateTarget {
        match &self.kind {
            CollectionKind::Singleton { key } => CreateTarget::Overwrite {
                path: self.record_path(key),
                id: key.clone(),
            },
            CollectionKind::Keyed => CreateTarget::Append {
                path: self.path.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    collections: Vec<CollectionSpec>,
    fallback: usize,
}

impl Schema {
    /// `fallback_type` names the collection that receives records of any unknown type.
    /// Returns `None` if no collection has that type.
    pub fn new(collections: Vec<CollectionSpec>, fallback_type: &str) -> Option<Self> {
        let fallback = collections
            .iter()
            .position(|c| c.record_type == fallback_type)?;
        Some(Self {
            collections,
            fallback,
        })
    }

    /// `settings/default_settings` followed by `attendance/{id}`.
    pub fn attendance() -> Self {
        Self {
            collections: vec![
                CollectionSpec::singleton(SETTINGS_TYPE, "settings", DEFAULT_SETTINGS_ID),
                CollectionSpec::keyed(ATTENDANCE_TYPE, "attendance"),
            ],
            fallback: 1,
        }
    }

    /// Collections in projection order.
    pub fn collections(&self) -> &[CollectionSpec] {
        &self.collections
    }

    pub fn collection(&self, record_type: &str) -> Option<&CollectionSpec> {
        self.collections
            .iter()
            .find(|c| c.record_type == record_type)
    }

    pub fn collection_for(&self, record_type: &str) -> &CollectionSpec {
        self.collection(record_type)
            .unwrap_or(&self.collections[self.fallback])
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::attendance()
    }
}

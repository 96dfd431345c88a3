//! # Projection
//! Every time the database changes, the whole tree under the root path is flattened into one
//! ordered list: collections in schema order, and within a keyed collection, records in the
//! database's key order. Nothing is merged, deduplicated, or sorted beyond that.

use serde_json::Value;

use crate::path;

use super::{CollectionKind, Record, Schema};

fn lookup<'a>(snapshot: &'a Value, at: &str) -> Option<&'a Value> {
    path::segments(at).try_fold(snapshot, |node, segment| node.get(segment))
}

impl Schema {
    pub fn project(&self, snapshot: &Value) -> Vec<Record> {
        let mut records = Vec::new();

        for collection in self.collections() {
            let Some(node) = lookup(snapshot, &collection.path) else {
                continue;
            };

            match &collection.kind {
                CollectionKind::Singleton { key } => {
                    if let Some(value) = node.get(key.as_str()) {
                        records.extend(Record::from_stored(key, &collection.record_type, value));
                    }
                }
                CollectionKind::Keyed => {
                    let Some(entries) = node.as_object() else {
                        log::warn!("Expected a collection at {}, skipping", collection.path);
                        continue;
                    };
                    for (key, value) in entries {
                        match Record::from_stored(key, &collection.record_type, value) {
                            Some(record) => records.push(record),
                            None => log::warn!("Skipping non-record entry {}/{key}", collection.path),
                        }
                    }
                }
            }
        }

        records
    }
}

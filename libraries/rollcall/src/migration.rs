//! # Migration
//! Older versions of the app kept every record as one JSON array in local storage. The first
//! time a device runs this version, that array is copied into the database:
//! 1. If the database already has attendance records it is authoritative. The local copy is
//!    thrown away and nothing is written.
//! 2. The settings record is written only if the database has none.
//! 3. Attendance records are pushed one at a time, in their original order.
//!
//! Progress is checkpointed in local storage before the first write and after every write. When
//! the database becomes unreachable halfway through, the migration stays pending and the next run
//! picks up where this one stopped, instead of mistaking its own half-written records for
//! authoritative data. Nothing is written while the checkpoint can't be saved.
//! Failures that won't go away by retrying (a rejected write, say) end the migration for good.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data_model::{CollectionKind, Record, Schema};
use crate::{LegacyStore, LocalStorageError, RemoteError, RemoteStore, SyncConfig, SyncError, path};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationCheckpoint {
    /// Records already copied into the database, per record type.
    pub written: BTreeMap<String, usize>,
}

impl MigrationCheckpoint {
    pub fn count(&self, record_type: &str) -> usize {
        self.written.get(record_type).copied().unwrap_or(0)
    }

    fn record_write(&mut self, record_type: &str) {
        *self.written.entry(record_type.to_string()).or_default() += 1;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi))]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MigrationOutcome {
    AlreadyDone,
    /// Another call is already migrating.
    InProgress,
    NoLegacyData,
    /// The legacy value was valid JSON but not an array.
    ShapeMismatch,
    /// The database already had attendance records; the legacy copy was discarded.
    RemoteAuthoritative,
    /// Counts include records written by earlier, interrupted runs.
    Migrated { written: BTreeMap<String, usize> },
    /// Stopped by a transient failure. Running again will resume.
    Deferred { reason: String },
    /// Stopped by a permanent failure. The legacy data is left in place.
    Abandoned { reason: String },
}

impl MigrationOutcome {
    /// Whether the store should stop attempting the migration.
    pub fn marks_done(&self) -> bool {
        !matches!(
            self,
            MigrationOutcome::InProgress | MigrationOutcome::Deferred { .. }
        )
    }

    pub fn written(&self, record_type: &str) -> usize {
        match self {
            MigrationOutcome::Migrated { written } => {
                written.get(record_type).copied().unwrap_or(0)
            }
            _ => 0,
        }
    }
}

enum Copied {
    Everything,
    RemoteAuthoritative,
}

enum Interrupted {
    Remote(RemoteError),
    Checkpoint(LocalStorageError),
}

impl From<RemoteError> for Interrupted {
    fn from(error: RemoteError) -> Self {
        Interrupted::Remote(error)
    }
}

impl From<LocalStorageError> for Interrupted {
    fn from(error: LocalStorageError) -> Self {
        Interrupted::Checkpoint(error)
    }
}

pub(crate) struct Migration<'a, R, L> {
    pub remote: &'a R,
    pub legacy: &'a L,
    pub schema: &'a Schema,
    pub config: &'a SyncConfig,
}

impl<R: RemoteStore, L: LegacyStore> Migration<'_, R, L> {
    /// `Err(SyncError::MigrationParse)` means the legacy value isn't JSON. It is left alone so a
    /// later run can try again.
    pub(crate) async fn run(&self) -> Result<MigrationOutcome, SyncError> {
        let blob = match self.legacy.get_item(&self.config.legacy_storage_key) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                self.clear_local();
                return Ok(MigrationOutcome::NoLegacyData);
            }
            Err(e) => {
                log::warn!("Could not read legacy records: {e}");
                return Ok(MigrationOutcome::Deferred {
                    reason: e.to_string(),
                });
            }
        };

        let parsed: Value = serde_json::from_str(&blob)
            .map_err(|e| SyncError::MigrationParse(e.to_string()))
            .inspect_err(|e| log::error!("{e}"))?;

        let Value::Array(items) = parsed else {
            log::warn!("Legacy records are not an array, giving up on migrating them");
            return Ok(MigrationOutcome::ShapeMismatch);
        };

        let records: Vec<Record> = items
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| {
                serde_json::from_value::<Record>(item)
                    .inspect_err(|e| log::warn!("Skipping legacy record {i}: {e}"))
                    .ok()
            })
            .collect();

        let checkpoint = self.load_checkpoint();
        let resuming = checkpoint.is_some();
        let mut progress = checkpoint.unwrap_or_default();
        if resuming {
            log::info!("Resuming interrupted migration: {:?}", progress.written);
        }

        match self.copy(&records, resuming, &mut progress).await {
            Ok(Copied::RemoteAuthoritative) => {
                log::info!("Database already has attendance records, discarding legacy copy");
                self.clear_local();
                Ok(MigrationOutcome::RemoteAuthoritative)
            }
            Ok(Copied::Everything) => {
                log::info!("Migrated legacy records: {:?}", progress.written);
                self.clear_local();
                Ok(MigrationOutcome::Migrated {
                    written: progress.written,
                })
            }
            Err(Interrupted::Checkpoint(error)) => {
                log::warn!("Could not save migration checkpoint, will resume later: {error}");
                Ok(MigrationOutcome::Deferred {
                    reason: format!("could not save migration checkpoint: {error}"),
                })
            }
            Err(Interrupted::Remote(error)) if error.is_retryable() => {
                log::warn!("Migration interrupted, will resume later: {error}");
                Ok(MigrationOutcome::Deferred {
                    reason: error.message,
                })
            }
            Err(Interrupted::Remote(error)) => {
                log::error!("Migration failed permanently: {error}");
                Ok(MigrationOutcome::Abandoned {
                    reason: error.message,
                })
            }
        }
    }

    async fn copy(
        &self,
        records: &[Record],
        resuming: bool,
        progress: &mut MigrationCheckpoint,
    ) -> Result<Copied, Interrupted> {
        // Anything already under a keyed collection was either written by another device or,
        // when resuming, by us.
        if !resuming {
            for collection in self.schema.collections() {
                if collection.is_singleton() {
                    continue;
                }
                if self.remote.child_count(&self.at(&collection.path)).await? > 0 {
                    return Ok(Copied::RemoteAuthoritative);
                }
            }
            // from here on, records in the database may be ours
            self.save_checkpoint(progress)?;
        }

        for collection in self.schema.collections() {
            let record_type = collection.record_type.as_str();
            let mut matching = records.iter().filter(|r| r.record_type == record_type);

            match &collection.kind {
                CollectionKind::Singleton { key } => {
                    if progress.count(record_type) > 0 {
                        continue;
                    }
                    let Some(record) = matching.next() else {
                        continue;
                    };
                    let slot = self.at(&collection.record_path(key));
                    if self.remote.exists(&slot).await? {
                        log::info!("Database already has {record_type}, keeping it");
                        continue;
                    }
                    self.remote.set(&slot, record.payload()).await?;
                    progress.record_write(record_type);
                    self.save_checkpoint(progress)?;
                }
                CollectionKind::Keyed => {
                    let target = self.at(&collection.path);
                    for record in matching.skip(progress.count(record_type)) {
                        self.remote.push(&target, record.payload()).await?;
                        progress.record_write(record_type);
                        self.save_checkpoint(progress)?;
                    }
                }
            }
        }

        Ok(Copied::Everything)
    }

    fn at(&self, relative: &str) -> String {
        path::join(&self.config.root_path, relative)
    }

    fn load_checkpoint(&self) -> Option<MigrationCheckpoint> {
        let raw = self
            .legacy
            .get_item(&self.config.checkpoint_key)
            .inspect_err(|e| log::warn!("Could not read migration checkpoint: {e}"))
            .ok()??;
        serde_json::from_str(&raw)
            .inspect_err(|e| log::warn!("Ignoring unreadable migration checkpoint: {e}"))
            .ok()
    }

    fn save_checkpoint(&self, progress: &MigrationCheckpoint) -> Result<(), LocalStorageError> {
        let raw = serde_json::to_string(progress).map_err(|e| LocalStorageError(e.to_string()))?;
        self.legacy.set_item(&self.config.checkpoint_key, &raw)
    }

    fn clear_local(&self) {
        for key in [&self.config.legacy_storage_key, &self.config.checkpoint_key] {
            if let Err(e) = self.legacy.remove_item(key) {
                log::warn!("Could not remove {key} from local storage: {e}");
            }
        }
    }
}

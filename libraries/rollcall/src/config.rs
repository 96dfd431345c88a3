use serde::{Deserialize, Serialize};

pub const DEFAULT_LEGACY_STORAGE_KEY: &str = "attendanceRecords";
pub const DEFAULT_CHECKPOINT_KEY: &str = "attendanceRecords.migration";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(from_wasm_abi, into_wasm_abi))]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Local storage key holding the JSON array written by older app versions.
    pub legacy_storage_key: String,
    /// Local storage key for the progress of a migration that was interrupted.
    pub checkpoint_key: String,
    /// Database path the collections live under. Empty means the database root.
    pub root_path: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            legacy_storage_key: DEFAULT_LEGACY_STORAGE_KEY.to_string(),
            checkpoint_key: DEFAULT_CHECKPOINT_KEY.to_string(),
            root_path: String::new(),
        }
    }
}

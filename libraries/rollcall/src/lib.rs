//! This is a library for keeping an attendance list in sync with a hosted realtime database.
//! It was created for a small attendance app, so it doesn't include much that was not needed for that project.
//!
//! Syncing strategy:
//! 1. The database holds two collections: a singleton `settings/default_settings` record and a keyed `attendance/{id}` collection.
//! 2. The app never keeps its own copy of the list. It subscribes to the database root, and every change is flattened into a list of records (settings first, then attendance in key order) and handed to a [`ChangeHandler`].
//! 3. Writes go straight to the database: settings overwrite their slot, attendance records are pushed under a generated key.
//! 4. Before the app first subscribes, any records left over in legacy local storage are moved into the database once.
//!
//! The migration is the only tricky part. It must never overwrite data that is already in the database, and it must not duplicate records when it's interrupted and run again.

pub mod data_model;

mod config;
mod error;
mod legacy;
mod memory;
mod migration;
mod path;
mod remote;
mod synced_store;

pub use config::SyncConfig;
pub use error::{LocalStorageError, RemoteError, RemoteErrorKind, SyncError};
pub use legacy::{LegacyStore, MemoryLegacyStore};
pub use memory::MemoryDatabase;
pub use migration::{MigrationCheckpoint, MigrationOutcome};
pub use remote::{RemoteStore, Subscription};
pub use synced_store::{Ack, ChangeHandler, IntoChangeHandler, SyncedStore};

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::Value;

use crate::data_model::{CreateTarget, Record, Schema};
use crate::migration::Migration;
use crate::{
    LegacyStore, MigrationOutcome, RemoteError, RemoteStore, Subscription, SyncConfig, SyncError,
    path,
};

/// Receives the flattened record list every time the database changes.
pub trait ChangeHandler {
    fn data_changed(&self, records: Vec<Record>);

    /// Called at most once, when the database kills the subscription.
    fn subscription_failed(&self, error: &RemoteError) {
        log::error!("Change subscription failed: {error}");
    }
}

/// Anything `init` can accept as a handler. Returns `None` when the value has no way to
/// receive changes, e.g. a JS object without an `onChange` method.
pub trait IntoChangeHandler {
    fn into_change_handler(self) -> Option<Rc<dyn ChangeHandler>>;
}

impl<H: ChangeHandler + 'static> IntoChangeHandler for Rc<H> {
    fn into_change_handler(self) -> Option<Rc<dyn ChangeHandler>> {
        Some(self as Rc<dyn ChangeHandler>)
    }
}

impl<H: IntoChangeHandler> IntoChangeHandler for Option<H> {
    fn into_change_handler(self) -> Option<Rc<dyn ChangeHandler>> {
        self.and_then(IntoChangeHandler::into_change_handler)
    }
}

/// Returned by successful writes.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Ack {
    /// Key of the record that was written or removed.
    pub id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    /// `init` is running the migration.
    Initializing,
    Ready,
}

/// Puts `cell` back to `to` on drop if it still holds `from`. Async callers can be dropped at
/// any `.await`, and a state flag left behind would lock the store.
struct Restore<'a, T: Copy + PartialEq> {
    cell: &'a Cell<T>,
    from: T,
    to: T,
}

impl<T: Copy + PartialEq> Drop for Restore<'_, T> {
    fn drop(&mut self) {
        if self.cell.get() == self.from {
            self.cell.set(self.to);
        }
    }
}

/// The attendance list, backed by a realtime database.
///
/// Not `Sync`: like everything else in the browser, it lives on one thread. No `RefCell` borrow
/// is ever held across an `.await` or while a handler runs, so handlers may call back into the
/// store.
pub struct SyncedStore<R, L> {
    remote: R,
    legacy: L,
    schema: Rc<Schema>,
    config: SyncConfig,

    lifecycle: Cell<Lifecycle>,
    migration_done: Cell<bool>,
    migration_running: Cell<bool>,
    subscription: RefCell<Option<Subscription>>,
}

impl<R: RemoteStore, L: LegacyStore> SyncedStore<R, L> {
    pub fn new(remote: R, legacy: L, config: SyncConfig) -> Self {
        Self::with_schema(remote, legacy, config, Schema::attendance())
    }

    pub fn with_schema(remote: R, legacy: L, config: SyncConfig, schema: Schema) -> Self {
        Self {
            remote,
            legacy,
            schema: Rc::new(schema),
            config,
            lifecycle: Cell::new(Lifecycle::Idle),
            migration_done: Cell::new(false),
            migration_running: Cell::new(false),
            subscription: RefCell::new(None),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.lifecycle.get() == Lifecycle::Ready
    }

    pub fn migration_done(&self) -> bool {
        self.migration_done.get()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Migrates legacy records, then starts pushing the record list to `handler`.
    ///
    /// Migration problems are logged, never returned: the app works without them, and a
    /// pending migration can be retried with [`SyncedStore::migrate`].
    pub async fn init(&self, handler: impl IntoChangeHandler) -> Result<(), SyncError> {
        if self.lifecycle.get() != Lifecycle::Idle {
            return Err(SyncError::AlreadyInitialized);
        }
        let handler = handler
            .into_change_handler()
            .ok_or(SyncError::InvalidHandler)?;

        self.lifecycle.set(Lifecycle::Initializing);
        let _reset = Restore {
            cell: &self.lifecycle,
            from: Lifecycle::Initializing,
            to: Lifecycle::Idle,
        };

        match self.migrate().await {
            Ok(outcome) => log::info!("Legacy migration: {outcome:?}"),
            Err(e) => log::warn!("Legacy migration left pending: {e}"),
        }

        let subscription = self
            .subscribe(handler)
            .inspect_err(|e| log::error!("Could not subscribe to changes: {e}"))?;

        *self.subscription.borrow_mut() = Some(subscription);
        self.lifecycle.set(Lifecycle::Ready);
        log::info!("Synced store initialized");
        Ok(())
    }

    fn subscribe(&self, handler: Rc<dyn ChangeHandler>) -> Result<Subscription, RemoteError> {
        let schema = Rc::clone(&self.schema);
        let on_value_handler = Rc::clone(&handler);
        let on_value = move |snapshot: Value| {
            on_value_handler.data_changed(schema.project(&snapshot));
        };

        let reported = Cell::new(false);
        let on_error = move |error: RemoteError| {
            if !reported.replace(true) {
                handler.subscription_failed(&error);
            }
        };

        self.remote
            .subscribe(&self.config.root_path, Box::new(on_value), Box::new(on_error))
    }

    /// Runs the legacy migration unless it has already finished. `init` calls this; call it
    /// again to retry a migration that was deferred or couldn't parse the legacy data.
    pub async fn migrate(&self) -> Result<MigrationOutcome, SyncError> {
        if self.migration_done.get() {
            return Ok(MigrationOutcome::AlreadyDone);
        }
        if self.migration_running.replace(true) {
            return Ok(MigrationOutcome::InProgress);
        }
        let running = Restore {
            cell: &self.migration_running,
            from: true,
            to: false,
        };

        let result = Migration {
            remote: &self.remote,
            legacy: &self.legacy,
            schema: &self.schema,
            config: &self.config,
        }
        .run()
        .await;

        drop(running);
        if let Ok(outcome) = &result
            && outcome.marks_done()
        {
            self.migration_done.set(true);
        }
        result
    }

    /// Settings overwrite the singleton slot; every other type is appended under a new key.
    pub async fn create(&self, record: &Record) -> Result<Ack, SyncError> {
        self.ensure_ready()?;
        let collection = self.schema.collection_for(record.require_type()?);

        let id = match collection.create_target() {
            CreateTarget::Overwrite { path, id } => {
                self.remote.set(&self.at(&path), record.payload()).await?;
                id
            }
            CreateTarget::Append { path } => {
                self.remote.push(&self.at(&path), record.payload()).await?
            }
        };
        Ok(Ack { id })
    }

    /// Replaces the stored record entirely. Fields missing from `record` are gone afterwards.
    pub async fn update(&self, record: &Record) -> Result<Ack, SyncError> {
        let location = self.existing_location(record)?;
        self.remote.set(&location, record.payload()).await?;
        Ok(Ack {
            id: record.require_id()?.to_string(),
        })
    }

    pub async fn delete(&self, record: &Record) -> Result<Ack, SyncError> {
        let location = self.existing_location(record)?;
        self.remote.remove(&location).await?;
        Ok(Ack {
            id: record.require_id()?.to_string(),
        })
    }

    /// Detaches from the database. The store can be initialized again afterwards; a finished
    /// migration stays finished.
    pub fn close(&self) -> Result<(), SyncError> {
        self.ensure_ready()?;
        // drop outside the borrow, cancelling may call back into the remote store
        let subscription = self.subscription.borrow_mut().take();
        drop(subscription);
        self.lifecycle.set(Lifecycle::Idle);
        log::info!("Synced store closed");
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), SyncError> {
        match self.lifecycle.get() {
            Lifecycle::Ready => Ok(()),
            Lifecycle::Idle | Lifecycle::Initializing => Err(SyncError::NotInitialized),
        }
    }

    fn existing_location(&self, record: &Record) -> Result<String, SyncError> {
        self.ensure_ready()?;
        let collection = self.schema.collection_for(record.require_type()?);
        Ok(self.at(&collection.record_path(record.require_id()?)))
    }

    fn at(&self, relative: &str) -> String {
        path::join(&self.config.root_path, relative)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use futures::FutureExt;
    use futures::executor::block_on;
    use serde_json::json;

    use super::*;
    use crate::config::DEFAULT_LEGACY_STORAGE_KEY;
    use crate::{MemoryDatabase, MemoryLegacyStore};

    #[derive(Default)]
    struct Recorder {
        projections: RefCell<Vec<Vec<Record>>>,
        errors: RefCell<Vec<RemoteError>>,
    }

    impl Recorder {
        fn last(&self) -> Vec<Record> {
            self.projections.borrow().last().cloned().unwrap_or_default()
        }
    }

    impl ChangeHandler for Recorder {
        fn data_changed(&self, records: Vec<Record>) {
            self.projections.borrow_mut().push(records);
        }

        fn subscription_failed(&self, error: &RemoteError) {
            self.errors.borrow_mut().push(error.clone());
        }
    }

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn store_with(
        remote: &MemoryDatabase,
        legacy: &MemoryLegacyStore,
    ) -> SyncedStore<MemoryDatabase, MemoryLegacyStore> {
        init_logging();
        SyncedStore::new(remote.clone(), legacy.clone(), SyncConfig::default())
    }

    fn ready_store() -> (
        SyncedStore<MemoryDatabase, MemoryLegacyStore>,
        MemoryDatabase,
        Rc<Recorder>,
    ) {
        let remote = MemoryDatabase::new();
        let store = store_with(&remote, &MemoryLegacyStore::new());
        let recorder = Rc::new(Recorder::default());
        block_on(store.init(Rc::clone(&recorder))).unwrap();
        (store, remote, recorder)
    }

    #[test]
    fn test_init_rejects_missing_handler() {
        let remote = MemoryDatabase::new();
        let legacy = MemoryLegacyStore::with_item(DEFAULT_LEGACY_STORAGE_KEY, "[]");
        let store = store_with(&remote, &legacy);

        let result = block_on(store.init(None::<Rc<Recorder>>));

        assert_eq!(result, Err(SyncError::InvalidHandler));
        assert!(!store.is_initialized());
        assert!(!store.migration_done());
        assert_eq!(remote.listener_count(), 0);
        assert!(legacy.item(DEFAULT_LEGACY_STORAGE_KEY).is_some());
    }

    #[test]
    fn test_init_twice_fails_without_migrating_again() {
        let remote = MemoryDatabase::new();
        let legacy = MemoryLegacyStore::new();
        let store = store_with(&remote, &legacy);
        block_on(store.init(Rc::new(Recorder::default()))).unwrap();

        legacy
            .set_item(
                DEFAULT_LEGACY_STORAGE_KEY,
                &json!([{"type": "attendance", "nama_lengkap": "late"}]).to_string(),
            )
            .unwrap();
        let result = block_on(store.init(Rc::new(Recorder::default())));

        assert_eq!(result, Err(SyncError::AlreadyInitialized));
        assert_eq!(remote.write_count(), 0);
        assert_eq!(remote.listener_count(), 1);
        assert!(legacy.item(DEFAULT_LEGACY_STORAGE_KEY).is_some());
    }

    #[test]
    fn test_init_migrates_legacy_records() {
        let remote = MemoryDatabase::new();
        let legacy = MemoryLegacyStore::with_item(
            DEFAULT_LEGACY_STORAGE_KEY,
            json!([
                {"type": "settings", "value": 1},
                {"type": "attendance", "nama_lengkap": "A"},
                {"type": "attendance", "nama_lengkap": "B"},
            ])
            .to_string(),
        );
        let store = store_with(&remote, &legacy);
        let recorder = Rc::new(Recorder::default());

        block_on(store.init(Rc::clone(&recorder))).unwrap();

        let settings = remote.snapshot("settings/default_settings");
        assert_eq!(settings["value"], json!(1));
        assert!(settings.get("id").is_none());

        let attendance = remote.snapshot("attendance");
        let attendance = attendance.as_object().unwrap();
        assert_eq!(attendance.len(), 2);
        let names: Vec<&Value> = attendance.values().map(|v| &v["nama_lengkap"]).collect();
        assert_eq!(names, vec![&json!("A"), &json!("B")]);
        assert!(attendance.keys().all(|k| !k.is_empty()));

        assert!(legacy.is_empty());
        assert!(store.migration_done());

        let projection = recorder.last();
        assert_eq!(projection.len(), 3);
        assert_eq!(projection[0].id.as_deref(), Some("default_settings"));
        assert_eq!(projection[1].field("nama_lengkap"), Some(&json!("A")));
        assert_eq!(projection[2].field("nama_lengkap"), Some(&json!("B")));
    }

    #[test]
    fn test_init_keeps_existing_remote_data() {
        let existing = json!({
            "attendance": {"-k1": {"type": "attendance", "nama_lengkap": "remote"}},
            "settings": {"default_settings": {"type": "settings", "value": 5}},
        });
        let remote = MemoryDatabase::with_data(existing.clone());
        let legacy = MemoryLegacyStore::with_item(
            DEFAULT_LEGACY_STORAGE_KEY,
            json!([{"type": "settings", "value": 1}, {"type": "attendance", "nama_lengkap": "local"}])
                .to_string(),
        );
        let store = store_with(&remote, &legacy);

        block_on(store.init(Rc::new(Recorder::default()))).unwrap();

        assert_eq!(remote.snapshot(""), existing);
        assert!(legacy.item(DEFAULT_LEGACY_STORAGE_KEY).is_none());
    }

    #[test]
    fn test_init_survives_unparseable_legacy_data() {
        let remote = MemoryDatabase::new();
        let legacy = MemoryLegacyStore::with_item(DEFAULT_LEGACY_STORAGE_KEY, "not json");
        let store = store_with(&remote, &legacy);

        block_on(store.init(Rc::new(Recorder::default()))).unwrap();
        assert!(store.is_initialized());
        assert!(!store.migration_done());

        legacy
            .set_item(
                DEFAULT_LEGACY_STORAGE_KEY,
                &json!([{"type": "attendance", "nama_lengkap": "A"}]).to_string(),
            )
            .unwrap();
        let outcome = block_on(store.migrate()).unwrap();
        assert_eq!(outcome.written("attendance"), 1);
        assert!(store.migration_done());
        assert_eq!(block_on(store.migrate()), Ok(MigrationOutcome::AlreadyDone));
    }

    #[test]
    fn test_deferred_migration_can_be_retried_after_init() {
        let remote = MemoryDatabase::new();
        let legacy = MemoryLegacyStore::with_item(
            DEFAULT_LEGACY_STORAGE_KEY,
            json!([
                {"type": "attendance", "nama_lengkap": "A"},
                {"type": "attendance", "nama_lengkap": "B"},
            ])
            .to_string(),
        );
        let store = store_with(&remote, &legacy);
        remote.fail_writes_after(1, RemoteError::unavailable("network error"));

        block_on(store.init(Rc::new(Recorder::default()))).unwrap();
        assert!(!store.migration_done());

        let outcome = block_on(store.migrate()).unwrap();
        assert_eq!(outcome.written("attendance"), 2);
        assert_eq!(remote.snapshot("attendance").as_object().unwrap().len(), 2);
    }

    struct Stalling {
        inner: MemoryDatabase,
        stalled: Cell<bool>,
    }

    impl Stalling {
        async fn wait(&self) {
            if self.stalled.get() {
                futures::future::pending::<()>().await;
            }
        }
    }

    impl RemoteStore for Stalling {
        async fn get(&self, path: &str) -> Result<Option<Value>, RemoteError> {
            self.inner.get(path).await
        }
        async fn set(&self, path: &str, value: Value) -> Result<(), RemoteError> {
            self.wait().await;
            self.inner.set(path, value).await
        }
        async fn push(&self, path: &str, value: Value) -> Result<String, RemoteError> {
            self.wait().await;
            self.inner.push(path, value).await
        }
        async fn remove(&self, path: &str) -> Result<(), RemoteError> {
            self.wait().await;
            self.inner.remove(path).await
        }
        fn subscribe(
            &self,
            path: &str,
            on_value: Box<dyn Fn(Value)>,
            on_error: Box<dyn Fn(RemoteError)>,
        ) -> Result<Subscription, RemoteError> {
            self.inner.subscribe(path, on_value, on_error)
        }
    }

    #[test]
    fn test_abandoned_init_and_migrate_can_run_again() {
        init_logging();
        let remote = MemoryDatabase::new();
        let legacy = MemoryLegacyStore::with_item(
            DEFAULT_LEGACY_STORAGE_KEY,
            json!([{"type": "attendance", "nama_lengkap": "A"}]).to_string(),
        );
        let store = SyncedStore::new(
            Stalling {
                inner: remote.clone(),
                stalled: Cell::new(true),
            },
            legacy.clone(),
            SyncConfig::default(),
        );

        {
            let mut init = Box::pin(store.init(Rc::new(Recorder::default())));
            assert!((&mut init).now_or_never().is_none());
        }
        assert!(!store.is_initialized());
        {
            let mut migrate = Box::pin(store.migrate());
            assert!((&mut migrate).now_or_never().is_none());
        }

        store.remote.stalled.set(false);
        let outcome = block_on(store.migrate()).unwrap();
        assert_eq!(outcome.written("attendance"), 1);
        block_on(store.init(Rc::new(Recorder::default()))).unwrap();
        assert!(store.is_initialized());
        assert_eq!(remote.snapshot("attendance").as_object().unwrap().len(), 1);
        assert!(legacy.is_empty());
    }

    #[test]
    fn test_operations_require_init() {
        let remote = MemoryDatabase::new();
        let store = store_with(&remote, &MemoryLegacyStore::new());
        let record = Record::new("attendance").with_id("k");

        assert_eq!(block_on(store.create(&record)), Err(SyncError::NotInitialized));
        assert_eq!(block_on(store.update(&record)), Err(SyncError::NotInitialized));
        assert_eq!(block_on(store.delete(&record)), Err(SyncError::NotInitialized));
        assert_eq!(store.close(), Err(SyncError::NotInitialized));
        assert_eq!(remote.write_count(), 0);
    }

    #[test]
    fn test_create_settings_overwrites() {
        let (store, remote, recorder) = ready_store();

        let first = block_on(store.create(&Record::new("settings").with_field("value", 1))).unwrap();
        block_on(store.create(&Record::new("settings").with_field("value", 2).with_id("ignored")))
            .unwrap();

        assert_eq!(first.id, "default_settings");
        assert_eq!(
            remote.snapshot("settings"),
            json!({"default_settings": {"type": "settings", "value": 2}})
        );
        let projection = recorder.last();
        assert_eq!(projection.len(), 1);
        assert_eq!(projection[0].field("value"), Some(&json!(2)));
    }

    #[test]
    fn test_create_unknown_type_goes_to_attendance() {
        let (store, remote, _recorder) = ready_store();
        let ack = block_on(store.create(&Record::new("izin").with_field("alasan", "sakit"))).unwrap();

        assert_eq!(
            remote.snapshot(&format!("attendance/{}", ack.id)),
            json!({"type": "izin", "alasan": "sakit"})
        );
    }

    #[test]
    fn test_create_requires_type() {
        let (store, remote, _recorder) = ready_store();
        let result = block_on(store.create(&Record::default().with_field("x", 1)));
        assert!(matches!(result, Err(SyncError::InvalidRecord(_))));
        assert_eq!(remote.write_count(), 0);
    }

    #[test]
    fn test_update_and_delete_require_id() {
        let (store, remote, _recorder) = ready_store();
        let record = Record::new("attendance").with_field("nama_lengkap", "A");

        assert!(matches!(
            block_on(store.update(&record)),
            Err(SyncError::InvalidRecord(_))
        ));
        assert!(matches!(
            block_on(store.delete(&record)),
            Err(SyncError::InvalidRecord(_))
        ));
        assert_eq!(remote.write_count(), 0);
    }

    #[test]
    fn test_ids_spanning_several_keys_mutate_nothing() {
        let (store, remote, recorder) = ready_store();
        for name in ["A", "B", "C"] {
            block_on(store.create(&Record::new("attendance").with_field("nama_lengkap", name)))
                .unwrap();
        }
        block_on(store.create(&Record::new("settings").with_field("value", 1))).unwrap();
        let writes = remote.write_count();
        let before = remote.snapshot("");

        for id in ["/", "a/", "a/b"] {
            assert!(matches!(
                block_on(store.delete(&Record::new("attendance").with_id(id))),
                Err(SyncError::InvalidRecord(_))
            ));
            assert!(matches!(
                block_on(store.update(&Record::new("settings").with_id(id).with_field("x", 1))),
                Err(SyncError::InvalidRecord(_))
            ));
        }

        assert_eq!(remote.write_count(), writes);
        assert_eq!(remote.snapshot(""), before);
        assert_eq!(recorder.last().len(), 4);
    }

    #[test]
    fn test_create_update_delete_round_trip() {
        let (store, _remote, recorder) = ready_store();

        block_on(store.create(&Record::new("attendance").with_field("nama_lengkap", "A"))).unwrap();
        let created = recorder.last();
        assert_eq!(created.len(), 1);
        let id = created[0].id.clone().unwrap();
        assert!(!id.is_empty());

        let updated = Record::new("attendance")
            .with_id(id.clone())
            .with_field("nama_lengkap", "A")
            .with_field("status", "hadir");
        block_on(store.update(&updated)).unwrap();
        let after_update = recorder.last();
        assert_eq!(after_update.len(), 1);
        assert_eq!(after_update[0].id.as_deref(), Some(id.as_str()));
        assert_eq!(after_update[0].field("status"), Some(&json!("hadir")));

        block_on(store.delete(&updated)).unwrap();
        assert!(recorder.last().iter().all(|r| r.id.as_deref() != Some(id.as_str())));
    }

    #[test]
    fn test_update_replaces_instead_of_merging() {
        let (store, remote, _recorder) = ready_store();
        let ack = block_on(store.create(
            &Record::new("attendance")
                .with_field("nama_lengkap", "A")
                .with_field("kelas", "5B"),
        ))
        .unwrap();

        block_on(store.update(
            &Record::new("attendance")
                .with_id(ack.id.clone())
                .with_field("nama_lengkap", "A2"),
        ))
        .unwrap();

        assert_eq!(
            remote.snapshot(&format!("attendance/{}", ack.id)),
            json!({"type": "attendance", "nama_lengkap": "A2"})
        );
    }

    #[test]
    fn test_write_failures_surface_as_store_errors() {
        let (store, remote, _recorder) = ready_store();
        remote.fail_writes_after(0, RemoteError::rejected("PERMISSION_DENIED"));

        let result = block_on(store.create(&Record::new("attendance")));
        assert_eq!(
            result,
            Err(SyncError::Store(RemoteError::rejected("PERMISSION_DENIED")))
        );
    }

    #[test]
    fn test_subscription_error_is_reported_once() {
        let (store, remote, recorder) = ready_store();
        remote.fail_listeners(RemoteError::rejected("permission_denied"));

        assert_eq!(recorder.errors.borrow().len(), 1);
        assert!(store.is_initialized());
    }

    #[test]
    fn test_subscribe_failure_leaves_store_uninitialized() {
        struct Unreachable(MemoryDatabase);

        impl RemoteStore for Unreachable {
            async fn get(&self, path: &str) -> Result<Option<Value>, RemoteError> {
                self.0.get(path).await
            }
            async fn set(&self, path: &str, value: Value) -> Result<(), RemoteError> {
                self.0.set(path, value).await
            }
            async fn push(&self, path: &str, value: Value) -> Result<String, RemoteError> {
                self.0.push(path, value).await
            }
            async fn remove(&self, path: &str) -> Result<(), RemoteError> {
                self.0.remove(path).await
            }
            fn subscribe(
                &self,
                _path: &str,
                _on_value: Box<dyn Fn(Value)>,
                _on_error: Box<dyn Fn(RemoteError)>,
            ) -> Result<Subscription, RemoteError> {
                Err(RemoteError::unavailable("websocket closed"))
            }
        }

        let store = SyncedStore::new(
            Unreachable(MemoryDatabase::new()),
            MemoryLegacyStore::new(),
            SyncConfig::default(),
        );
        let result = block_on(store.init(Rc::new(Recorder::default())));

        assert_eq!(
            result,
            Err(SyncError::Store(RemoteError::unavailable("websocket closed")))
        );
        assert!(!store.is_initialized());
    }

    #[test]
    fn test_close_detaches_and_allows_reinit() {
        let (store, remote, recorder) = ready_store();
        store.close().unwrap();

        assert_eq!(remote.listener_count(), 0);
        assert!(!store.is_initialized());
        let seen = recorder.projections.borrow().len();
        block_on(remote.push("attendance", json!({"type": "attendance"}))).unwrap();
        assert_eq!(recorder.projections.borrow().len(), seen);

        block_on(store.init(Rc::clone(&recorder))).unwrap();
        assert_eq!(recorder.last().len(), 1);
    }

    #[test]
    fn test_root_path_prefixes_every_location() {
        let remote = MemoryDatabase::new();
        let config = SyncConfig {
            root_path: "schools/sdn-1".to_string(),
            ..SyncConfig::default()
        };
        let store = SyncedStore::new(remote.clone(), MemoryLegacyStore::new(), config);
        let recorder = Rc::new(Recorder::default());
        block_on(store.init(Rc::clone(&recorder))).unwrap();

        block_on(store.create(&Record::new("settings").with_field("value", 3))).unwrap();

        assert_eq!(
            remote.snapshot("schools/sdn-1/settings/default_settings")["value"],
            json!(3)
        );
        assert_eq!(recorder.last()[0].id.as_deref(), Some("default_settings"));
    }
}

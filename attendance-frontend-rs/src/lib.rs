mod browser_storage;
mod js_handler;
mod js_remote;
mod results;
mod utils;

use std::sync::LazyLock;

use rollcall::data_model::Record;
use rollcall::{SyncConfig, SyncError, SyncedStore};
use wasm_bindgen::prelude::*;

pub use browser_storage::BrowserLegacyStore;
pub use js_handler::JsHandler;
pub use js_remote::JsRemoteStore;
pub use results::{ErrorInfo, MigrationResult, OperationResult};

/// The attendance list for the UI. Construct one and hand it to whatever owns the page.
#[wasm_bindgen]
pub struct AttendanceStore {
    // never hold a borrow across an .await: JS callbacks re-enter the store while we're suspended
    store: SyncedStore<JsRemoteStore, BrowserLegacyStore>,
}

// putting this inside LOGGER prevents us from accidentally initializing the logger more than once
static LOGGER: LazyLock<()> = LazyLock::new(|| {
    utils::set_panic_hook();

    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Logging initialized");
});

fn parse_config(config: JsValue) -> Result<SyncConfig, JsValue> {
    if config.is_undefined() || config.is_null() {
        return Ok(SyncConfig::default());
    }
    serde_wasm_bindgen::from_value(config)
        .map_err(|e| JsValue::from_str(&format!("invalid config: {e}")))
}

fn parse_record(record: JsValue) -> Result<Record, SyncError> {
    if !record.is_object() {
        return Err(SyncError::InvalidRecord("record is not an object".to_string()));
    }
    serde_wasm_bindgen::from_value(record).map_err(|e| SyncError::InvalidRecord(e.to_string()))
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
impl AttendanceStore {
    /// `database` is the adapter object described in [`JsRemoteStore`]. `config` may be
    /// omitted, or any subset of [`SyncConfig`]'s fields.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen(constructor))]
    pub fn new(database: js_sys::Object, config: JsValue) -> Result<AttendanceStore, JsValue> {
        LazyLock::force(&LOGGER);

        let config = parse_config(config).inspect_err(|e| {
            log::error!("Rejecting store config: {e:?}");
        })?;

        Ok(Self {
            store: SyncedStore::new(
                JsRemoteStore::new(database),
                BrowserLegacyStore::local(),
                config,
            ),
        })
    }

    /// Moves legacy `localStorage` records into the database, then calls `handler.onChange`
    /// with the full record list now and after every change.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn init(&self, handler: JsValue) -> OperationResult {
        self.store.init(JsHandler(handler)).await.into()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn create(&self, record: JsValue) -> OperationResult {
        match parse_record(record) {
            Ok(record) => self.store.create(&record).await.into(),
            Err(e) => OperationResult::failed(&e),
        }
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn update(&self, record: JsValue) -> OperationResult {
        match parse_record(record) {
            Ok(record) => self.store.update(&record).await.into(),
            Err(e) => OperationResult::failed(&e),
        }
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn delete(&self, record: JsValue) -> OperationResult {
        match parse_record(record) {
            Ok(record) => self.store.delete(&record).await.into(),
            Err(e) => OperationResult::failed(&e),
        }
    }

    /// Retries a migration that `init` couldn't finish.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn migrate(&self) -> MigrationResult {
        self.store.migrate().await.into()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn close(&self) -> OperationResult {
        self.store.close().into()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen(getter))]
    pub fn initialized(&self) -> bool {
        self.store.is_initialized()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen(getter))]
    pub fn migration_done(&self) -> bool {
        self.store.migration_done()
    }
}

use rollcall::{LegacyStore, LocalStorageError};
use wasm_bindgen::JsValue;
use web_sys::Storage;

/// `window.localStorage`. When it can't be opened (private browsing, sandboxed iframes) the
/// store behaves as if it were empty and writes are dropped.
pub struct BrowserLegacyStore {
    storage: Option<Storage>,
}

impl BrowserLegacyStore {
    pub fn local() -> Self {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        if storage.is_none() {
            log::warn!("localStorage is unavailable, there is nothing to migrate");
        }
        Self { storage }
    }
}

fn storage_error(error: JsValue) -> LocalStorageError {
    LocalStorageError(format!("{error:?}"))
}

impl LegacyStore for BrowserLegacyStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalStorageError> {
        match &self.storage {
            Some(storage) => storage.get_item(key).map_err(storage_error),
            None => Ok(None),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalStorageError> {
        match &self.storage {
            Some(storage) => storage.set_item(key, value).map_err(storage_error),
            None => Ok(()),
        }
    }

    fn remove_item(&self, key: &str) -> Result<(), LocalStorageError> {
        match &self.storage {
            Some(storage) => storage.remove_item(key).map_err(storage_error),
            None => Ok(()),
        }
    }
}

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::LocalStorageError;

/// String key-value storage that older app versions kept records in (`localStorage` in the
/// browser). Reads and writes are synchronous, like the Web Storage API.
pub trait LegacyStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalStorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalStorageError>;
    fn remove_item(&self, key: &str) -> Result<(), LocalStorageError>;
}

/// A `LegacyStore` held in memory. Clones share the same items.
#[derive(Clone, Debug, Default)]
pub struct MemoryLegacyStore {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryLegacyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(key: &str, value: impl Into<String>) -> Self {
        let store = Self::new();
        store.items.borrow_mut().insert(key.to_string(), value.into());
        store
    }

    pub fn item(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl LegacyStore for MemoryLegacyStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, LocalStorageError> {
        Ok(self.item(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), LocalStorageError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), LocalStorageError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

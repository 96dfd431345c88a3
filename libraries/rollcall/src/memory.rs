//! An in-memory stand-in for the hosted database. It behaves the way the real one does where
//! this library cares: children enumerate in key order, empty nodes disappear, listeners get the
//! current value as soon as they attach, and pushed keys sort in insertion order.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use pushkey::PushKeyGenerator;
use serde_json::{Map, Value};
use slotmap::{DefaultKey, SlotMap};

use crate::{RemoteError, RemoteStore, Subscription, path};

type ValueCallback = Rc<dyn Fn(Value)>;
type ErrorCallback = Rc<dyn Fn(RemoteError)>;

struct Listener {
    path: String,
    on_value: ValueCallback,
    on_error: ErrorCallback,
}

#[derive(Default)]
struct Inner {
    root: Value,
    listeners: SlotMap<DefaultKey, Listener>,
    keys: PushKeyGenerator,
    offline: bool,
    /// `(n, error)`: let `n` more writes through, then fail the next one with `error`.
    injected_failure: Option<(usize, RemoteError)>,
    writes: usize,
}

impl Inner {
    fn begin_write(&mut self) -> Result<(), RemoteError> {
        if self.offline {
            return Err(RemoteError::unavailable("client is offline"));
        }
        match self.injected_failure.take() {
            Some((0, error)) => return Err(error),
            Some((remaining, error)) => self.injected_failure = Some((remaining - 1, error)),
            None => {}
        }
        Ok(())
    }
}

/// Clones share the same tree and listeners.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(root: Value) -> Self {
        let database = Self::new();
        database.inner.borrow_mut().root = root;
        database
    }

    /// Current value at `at`, `Value::Null` if there is none.
    pub fn snapshot(&self, at: &str) -> Value {
        value_at(&self.inner.borrow().root, at)
    }

    pub fn go_offline(&self) {
        self.inner.borrow_mut().offline = true;
    }

    pub fn go_online(&self) {
        self.inner.borrow_mut().offline = false;
    }

    /// Let `successful_writes` more writes through, then fail the next one with `error`.
    pub fn fail_writes_after(&self, successful_writes: usize, error: RemoteError) {
        self.inner.borrow_mut().injected_failure = Some((successful_writes, error));
    }

    /// Number of successful `set`, `push` and `remove` calls so far.
    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Kill every listener with `error`, the way the hosted database cancels listeners whose
    /// permissions were revoked.
    pub fn fail_listeners(&self, error: RemoteError) {
        let failed: Vec<ErrorCallback> = {
            let mut inner = self.inner.borrow_mut();
            let failed: Vec<ErrorCallback> = inner
                .listeners
                .values()
                .map(|l| Rc::clone(&l.on_error))
                .collect();
            inner.listeners.clear();
            failed
        };
        for on_error in failed {
            on_error(error.clone());
        }
    }

    fn write(&self, at: &str, value: Value) -> Result<(), RemoteError> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.begin_write()?;
            write_at(&mut inner.root, at, value);
            inner.writes += 1;
        }
        self.notify(at);
        Ok(())
    }

    /// Never call a listener while `inner` is borrowed: listeners call back into the database.
    fn notify(&self, changed: &str) {
        let due: Vec<(ValueCallback, Value)> = {
            let inner = self.inner.borrow();
            inner
                .listeners
                .values()
                .filter(|l| path::overlaps(&l.path, changed))
                .map(|l| (Rc::clone(&l.on_value), value_at(&inner.root, &l.path)))
                .collect()
        };
        for (on_value, value) in due {
            on_value(value);
        }
    }
}

impl RemoteStore for MemoryDatabase {
    async fn get(&self, at: &str) -> Result<Option<Value>, RemoteError> {
        let inner = self.inner.borrow();
        if inner.offline {
            return Err(RemoteError::unavailable("client is offline"));
        }
        Ok(node_at(&inner.root, at)
            .filter(|v| !is_empty(v))
            .cloned())
    }

    async fn set(&self, at: &str, value: Value) -> Result<(), RemoteError> {
        self.write(at, value)
    }

    async fn push(&self, at: &str, value: Value) -> Result<String, RemoteError> {
        let key = {
            let mut inner = self.inner.borrow_mut();
            inner.begin_write()?;
            let key = inner.keys.next_key();
            write_at(&mut inner.root, &path::join(at, &key), value);
            inner.writes += 1;
            key
        };
        self.notify(&path::join(at, &key));
        Ok(key)
    }

    async fn remove(&self, at: &str) -> Result<(), RemoteError> {
        self.write(at, Value::Null)
    }

    fn subscribe(
        &self,
        at: &str,
        on_value: Box<dyn Fn(Value)>,
        on_error: Box<dyn Fn(RemoteError)>,
    ) -> Result<Subscription, RemoteError> {
        let on_value: ValueCallback = Rc::from(on_value);
        let (key, current) = {
            let mut inner = self.inner.borrow_mut();
            let key = inner.listeners.insert(Listener {
                path: at.to_string(),
                on_value: Rc::clone(&on_value),
                on_error: Rc::from(on_error),
            });
            (key, value_at(&inner.root, at))
        };

        on_value(current);

        let inner: Weak<RefCell<Inner>> = Rc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.borrow_mut().listeners.remove(key);
            }
        }))
    }
}

fn is_empty(value: &Value) -> bool {
    value.is_null() || value.as_object().is_some_and(|m| m.is_empty())
}

fn node_at<'a>(root: &'a Value, at: &str) -> Option<&'a Value> {
    path::segments(at).try_fold(root, |node, segment| node.get(segment))
}

fn value_at(root: &Value, at: &str) -> Value {
    node_at(root, at).cloned().unwrap_or(Value::Null)
}

fn object_mut(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

/// Writing null or an empty object is a delete.
fn write_at(root: &mut Value, at: &str, value: Value) {
    let segments: Vec<&str> = path::segments(at).collect();
    if is_empty(&value) {
        remove_at(root, &segments);
        return;
    }

    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for segment in parents {
        node = object_mut(node)
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }
    object_mut(node).insert(last.to_string(), value);
}

/// Removes the node and any parents left empty by the removal.
fn remove_at(node: &mut Value, segments: &[&str]) {
    let Some((first, rest)) = segments.split_first() else {
        *node = Value::Null;
        return;
    };
    let Value::Object(map) = &mut *node else {
        return;
    };

    if rest.is_empty() {
        map.remove(*first);
    } else if let Some(child) = map.get_mut(*first) {
        remove_at(child, rest);
        if is_empty(child) {
            map.remove(*first);
        }
    }

    if map.is_empty() {
        *node = Value::Null;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use futures::executor::block_on;
    use serde_json::json;

    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<Value>>>, Box<dyn Fn(Value)>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, Box::new(move |v| sink.borrow_mut().push(v)))
    }

    #[test]
    fn test_set_get_remove() {
        let db = MemoryDatabase::new();
        block_on(async {
            db.set("settings/default_settings", json!({"value": 1}))
                .await
                .unwrap();
            assert_eq!(
                db.get("settings/default_settings").await.unwrap(),
                Some(json!({"value": 1}))
            );
            assert!(db.exists("settings").await.unwrap());

            db.remove("settings/default_settings").await.unwrap();
            assert_eq!(db.get("settings").await.unwrap(), None);
            assert_eq!(db.snapshot(""), Value::Null);
        });
    }

    #[test]
    fn test_push_enumerates_in_insertion_order() {
        let db = MemoryDatabase::new();
        let keys: Vec<String> = block_on(async {
            let mut keys = Vec::new();
            for name in ["A", "B", "C", "D"] {
                keys.push(db.push("attendance", json!({"nama_lengkap": name})).await.unwrap());
            }
            keys
        });

        let snapshot = db.snapshot("attendance");
        let names: Vec<&str> = snapshot
            .as_object()
            .unwrap()
            .values()
            .map(|v| v["nama_lengkap"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
        assert_eq!(block_on(db.child_count("attendance")).unwrap(), keys.len());
    }

    #[test]
    fn test_listener_gets_current_value_then_changes() {
        let db = MemoryDatabase::with_data(json!({"settings": {"default_settings": {"value": 1}}}));
        let (seen, on_value) = recorder();
        let subscription = db.subscribe("", on_value, Box::new(|_| {})).unwrap();

        assert_eq!(seen.borrow().len(), 1);
        block_on(db.push("attendance", json!({"type": "attendance"}))).unwrap();
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(db.listener_count(), 1);

        drop(subscription);
        assert_eq!(db.listener_count(), 0);
        block_on(db.remove("attendance")).unwrap();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_listener_ignores_unrelated_paths() {
        let db = MemoryDatabase::new();
        let (seen, on_value) = recorder();
        let _subscription = db.subscribe("settings", on_value, Box::new(|_| {})).unwrap();

        block_on(db.push("attendance", json!({"type": "attendance"}))).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_offline_and_injected_failures() {
        let db = MemoryDatabase::new();
        db.go_offline();
        let error = block_on(db.get("attendance")).unwrap_err();
        assert!(error.is_retryable());

        db.go_online();
        db.fail_writes_after(1, RemoteError::rejected("PERMISSION_DENIED"));
        block_on(async {
            db.push("attendance", json!({"n": 1})).await.unwrap();
            let error = db.push("attendance", json!({"n": 2})).await.unwrap_err();
            assert_eq!(error, RemoteError::rejected("PERMISSION_DENIED"));
            db.push("attendance", json!({"n": 3})).await.unwrap();
        });
        assert_eq!(db.write_count(), 2);
    }

    #[test]
    fn test_fail_listeners() {
        let db = MemoryDatabase::new();
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        let _subscription = db
            .subscribe("", Box::new(|_| {}), Box::new(move |e| sink.borrow_mut().push(e)))
            .unwrap();

        db.fail_listeners(RemoteError::rejected("permission_denied"));
        assert_eq!(errors.borrow().len(), 1);
        assert_eq!(db.listener_count(), 0);
    }
}

//! The hosted database, as seen by this library: a JSON tree addressed by slash-separated paths.

use serde_json::Value;

use crate::RemoteError;

/// A realtime document store.
///
/// Futures returned by implementations don't need to be `Send`: in the browser everything runs
/// on one thread, and the JS-backed implementation holds `JsValue`s across awaits.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// The value at `path`, or `None` if nothing is stored there.
    async fn get(&self, path: &str) -> Result<Option<Value>, RemoteError>;

    async fn exists(&self, path: &str) -> Result<bool, RemoteError> {
        Ok(self.get(path).await?.is_some())
    }

    /// Number of direct children at `path`. A leaf value counts as zero.
    async fn child_count(&self, path: &str) -> Result<usize, RemoteError> {
        Ok(match self.get(path).await? {
            Some(Value::Object(children)) => children.len(),
            Some(Value::Array(children)) => children.len(),
            _ => 0,
        })
    }

    /// Replace whatever is at `path` with `value`.
    async fn set(&self, path: &str, value: Value) -> Result<(), RemoteError>;

    /// Store `value` under a newly generated child key of `path` and return that key.
    async fn push(&self, path: &str, value: Value) -> Result<String, RemoteError>;

    async fn remove(&self, path: &str) -> Result<(), RemoteError>;

    /// Watch `path`. `on_value` receives the full current value (`Value::Null` when empty) once
    /// the listener is attached and again after every change underneath it. After `on_error`
    /// fires the listener is dead and nothing more is delivered.
    fn subscribe(
        &self,
        path: &str,
        on_value: Box<dyn Fn(Value)>,
        on_error: Box<dyn Fn(RemoteError)>,
    ) -> Result<Subscription, RemoteError>;
}

/// Keeps a listener attached. Dropping it detaches the listener.
#[must_use = "dropping a Subscription detaches the listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

//! Bridges a JS database adapter into [`RemoteStore`]. The adapter is a plain object the app
//! builds around its database SDK:
//!
//! ```js
//! {
//!   get(path) { return get(ref(db, path)).then(s => s.val()) },
//!   set(path, value) { return set(ref(db, path), value) },
//!   push(path, value) { return push(ref(db, path), value).then(r => r.key) },
//!   remove(path) { return remove(ref(db, path)) },
//!   subscribe(path, next, fail) { return onValue(ref(db, path), s => next(s.val()), fail) },
//! }
//! ```
//!
//! Every method may return a value or a promise. `subscribe` returns the unsubscribe function.

use js_sys::{Array, Function, Object, Promise, Reflect};
use rollcall::{RemoteError, RemoteErrorKind, RemoteStore, Subscription};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

pub struct JsRemoteStore {
    adapter: Object,
}

impl JsRemoteStore {
    pub fn new(adapter: Object) -> Self {
        Self { adapter }
    }

    fn method(&self, name: &str) -> Result<Function, RemoteError> {
        Reflect::get(&self.adapter, &JsValue::from_str(name))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(|| {
                RemoteError::malformed(format!("database adapter has no `{name}` function"))
            })
    }

    async fn call(&self, name: &str, args: &[JsValue]) -> Result<JsValue, RemoteError> {
        let method = self.method(name)?;
        let args: Array = args.iter().collect();
        let returned = method.apply(&self.adapter, &args).map_err(remote_error)?;
        JsFuture::from(Promise::resolve(&returned))
            .await
            .map_err(remote_error)
    }
}

impl RemoteStore for JsRemoteStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, RemoteError> {
        let value = self.call("get", &[JsValue::from_str(path)]).await?;
        from_js(value)
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), RemoteError> {
        self.call("set", &[JsValue::from_str(path), to_js(&value)?])
            .await
            .map(|_| ())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, RemoteError> {
        self.call("push", &[JsValue::from_str(path), to_js(&value)?])
            .await?
            .as_string()
            .ok_or_else(|| RemoteError::malformed("push did not resolve to a key"))
    }

    async fn remove(&self, path: &str) -> Result<(), RemoteError> {
        self.call("remove", &[JsValue::from_str(path)])
            .await
            .map(|_| ())
    }

    fn subscribe(
        &self,
        path: &str,
        on_value: Box<dyn Fn(Value)>,
        on_error: Box<dyn Fn(RemoteError)>,
    ) -> Result<Subscription, RemoteError> {
        let on_value = Closure::<dyn Fn(JsValue)>::new(move |snapshot: JsValue| {
            match from_js(snapshot) {
                Ok(value) => on_value(value.unwrap_or(Value::Null)),
                Err(e) => log::error!("Dropping unreadable snapshot: {e}"),
            }
        });
        let on_error = Closure::<dyn Fn(JsValue)>::new(move |error: JsValue| {
            on_error(remote_error(error));
        });

        let unsubscribe = self
            .method("subscribe")?
            .call3(
                &self.adapter,
                &JsValue::from_str(path),
                on_value.as_ref(),
                on_error.as_ref(),
            )
            .map_err(remote_error)?
            .dyn_into::<Function>()
            .ok();
        if unsubscribe.is_none() {
            log::warn!("Database adapter's subscribe did not return an unsubscribe function");
        }

        Ok(Subscription::new(move || {
            if let Some(unsubscribe) = unsubscribe
                && let Err(e) = unsubscribe.call0(&JsValue::NULL)
            {
                log::warn!("Unsubscribing failed: {e:?}");
            }
            // the closures must outlive the JS listener
            drop(on_value);
            drop(on_error);
        }))
    }
}

fn to_js(value: &Value) -> Result<JsValue, RemoteError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| RemoteError::malformed(e.to_string()))
}

fn from_js(value: JsValue) -> Result<Option<Value>, RemoteError> {
    if value.is_null() || value.is_undefined() {
        return Ok(None);
    }
    serde_wasm_bindgen::from_value(value)
        .map(Some)
        .map_err(|e| RemoteError::malformed(e.to_string()))
}

fn string_property(value: &JsValue, name: &str) -> Option<String> {
    if !value.is_object() {
        return None;
    }
    Reflect::get(value, &JsValue::from_str(name))
        .ok()
        .and_then(|v| v.as_string())
}

/// Error codes from database SDKs, e.g. `PERMISSION_DENIED` or `database/permission-denied`.
/// Anything not recognizably a refusal is treated as a connectivity problem.
pub(crate) fn classify(code: &str) -> RemoteErrorKind {
    let code = code.to_ascii_lowercase().replace('-', "_");
    if code.contains("permission_denied") || code.contains("unauthorized") {
        RemoteErrorKind::Rejected
    } else if code.contains("invalid") {
        RemoteErrorKind::Malformed
    } else {
        RemoteErrorKind::Unavailable
    }
}

fn remote_error(error: JsValue) -> RemoteError {
    let code = string_property(&error, "code").unwrap_or_default();
    let message = string_property(&error, "message")
        .or_else(|| error.as_string())
        .unwrap_or_else(|| format!("{error:?}"));
    RemoteError::new(classify(&code), message)
}

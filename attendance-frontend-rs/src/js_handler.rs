use std::rc::Rc;

use js_sys::{Function, Reflect};
use rollcall::data_model::Record;
use rollcall::{ChangeHandler, IntoChangeHandler, RemoteError};
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;

use crate::results::ErrorInfo;

/// A handler passed in from JS: either an object with an `onChange(records)` method (and
/// optionally `onError(error)`), or a bare function.
pub struct JsHandler(pub JsValue);

struct JsChangeHandler {
    this: JsValue,
    on_change: Function,
    on_error: Option<Function>,
}

fn function_property(object: &JsValue, name: &str) -> Option<Function> {
    if !object.is_object() {
        return None;
    }
    Reflect::get(object, &JsValue::from_str(name))
        .ok()?
        .dyn_into::<Function>()
        .ok()
}

impl IntoChangeHandler for JsHandler {
    fn into_change_handler(self) -> Option<Rc<dyn ChangeHandler>> {
        let JsHandler(handler) = self;
        let handler = if let Some(on_change) = handler.dyn_ref::<Function>() {
            JsChangeHandler {
                this: JsValue::NULL,
                on_change: on_change.clone(),
                on_error: None,
            }
        } else {
            JsChangeHandler {
                on_change: function_property(&handler, "onChange")?,
                on_error: function_property(&handler, "onError"),
                this: handler,
            }
        };
        Some(Rc::new(handler) as Rc<dyn ChangeHandler>)
    }
}

impl ChangeHandler for JsChangeHandler {
    fn data_changed(&self, records: Vec<Record>) {
        let records = match records.serialize(&serde_wasm_bindgen::Serializer::json_compatible()) {
            Ok(records) => records,
            Err(e) => {
                log::error!("Could not convert records for JS: {e}");
                return;
            }
        };
        if let Err(e) = self.on_change.call1(&self.this, &records) {
            log::error!("onChange threw: {e:?}");
        }
    }

    fn subscription_failed(&self, error: &RemoteError) {
        log::error!("Change subscription failed: {error}");
        let Some(on_error) = &self.on_error else {
            return;
        };
        let info = ErrorInfo::from_remote(error);
        match info.serialize(&serde_wasm_bindgen::Serializer::json_compatible()) {
            Ok(info) => {
                if let Err(e) = on_error.call1(&self.this, &info) {
                    log::error!("onError threw: {e:?}");
                }
            }
            Err(e) => log::error!("Could not convert error for JS: {e}"),
        }
    }
}

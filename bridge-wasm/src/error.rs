//! Error types for WebAssembly bridge implementations

use bridge_traits::error::BridgeError;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

/// Result type for WebAssembly bridge operations
pub type WasmResult<T> = Result<T, WasmError>;

/// Errors raised while talking to browser APIs
#[derive(Error, Debug)]
pub enum WasmError {
    /// JavaScript error from web-sys
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// A browser global (window, performance, ...) is missing
    #[error("Browser API unavailable: {0}")]
    Unavailable(String),

    /// The browser could not decode the media
    #[error("Unsupported media: {0}")]
    Unsupported(String),
}

impl From<WasmError> for BridgeError {
    fn from(err: WasmError) -> Self {
        match err {
            WasmError::Unavailable(what) => BridgeError::NotAvailable(what),
            WasmError::Unsupported(what) => BridgeError::UnsupportedFormat(what),
            WasmError::JavaScript(message) => BridgeError::OperationFailed(message),
        }
    }
}

impl From<JsValue> for WasmError {
    fn from(js_value: JsValue) -> Self {
        WasmError::JavaScript(js_message(&js_value))
    }
}

/// Wrap a rejected promise or thrown value with the operation that failed.
pub(crate) fn js_error(context: &str, err: JsValue) -> BridgeError {
    BridgeError::OperationFailed(format!("{context}: {}", js_message(&err)))
}

pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(message) = value.as_string() {
        message
    } else if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        error.message().into()
    } else {
        format!("{value:?}")
    }
}

pub(crate) fn window() -> Result<web_sys::Window, BridgeError> {
    web_sys::window().ok_or_else(|| WasmError::Unavailable("window".to_string()).into())
}

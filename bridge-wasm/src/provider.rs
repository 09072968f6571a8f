//! JavaScript-hosted content generation.
//!
//! The text-to-speech service is called from JavaScript (API keys stay with
//! the host page). This module adapts a JS function into a
//! [`ContentProvider`].

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    ContentProvider, GeneratedContent, GenerationRequest,
};
use js_sys::{Function as JsFunction, Promise, Reflect};
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::error::js_error;

/// Content provider backed by a JavaScript function.
///
/// # Example
///
/// ```javascript
/// const provider = new JsContentProvider(async (itemId, prompt, voice) => {
///   const { script, audio } = await myTtsClient.generate(prompt, voice);
///   return { script, audio }; // audio: base64 PCM16 mono, 24 kHz
/// });
/// ```
#[wasm_bindgen]
#[derive(Clone)]
pub struct JsContentProvider {
    generate: JsFunction,
}

#[wasm_bindgen]
impl JsContentProvider {
    /// Wrap `generate(itemId, prompt, voice) => Promise<{ script, audio }>`.
    #[wasm_bindgen(constructor)]
    pub fn new(generate: JsFunction) -> JsContentProvider {
        Self { generate }
    }
}

#[async_trait(?Send)]
impl ContentProvider for JsContentProvider {
    async fn generate(&self, request: &GenerationRequest) -> BridgeResult<GeneratedContent> {
        let returned = self
            .generate
            .call3(
                &JsValue::NULL,
                &JsValue::from_str(&request.item_id),
                &JsValue::from_str(&request.prompt),
                &JsValue::from_str(&request.voice),
            )
            .map_err(|err| js_error("content generator", err))?;

        let resolved = match returned.dyn_into::<Promise>() {
            Ok(promise) => JsFuture::from(promise)
                .await
                .map_err(|err| js_error("content generator", err))?,
            Err(value) => value,
        };

        if resolved.is_null() || resolved.is_undefined() {
            return Err(BridgeError::OperationFailed(
                "content generator returned nothing".to_string(),
            ));
        }

        let script = string_field(&resolved, "script")?;
        let audio = string_field(&resolved, "audio")?;
        debug!(script_len = script.len(), audio_len = audio.len(), "Generated content received");
        Ok(GeneratedContent::new(script, audio))
    }
}

/// Missing or non-string fields read as empty.
fn string_field(object: &JsValue, name: &str) -> BridgeResult<String> {
    let value = Reflect::get(object, &JsValue::from_str(name))
        .map_err(|err| js_error("read generated content", err))?;
    Ok(value.as_string().unwrap_or_default())
}

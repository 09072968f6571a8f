//! Upload fetching through the browser `fetch` API.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    MediaFetcher,
};
use bytes::Bytes;
use futures::{
    future::{select, Either},
    pin_mut, FutureExt,
};
use gloo_timers::future::TimeoutFuture;
use js_sys::Uint8Array;
use std::time::Duration;
use tracing::debug;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, RequestInit, RequestMode, Response, Window};

use crate::error::{js_error, window};

/// Default limit for a single upload download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Fetches upload bytes from URLs (including `blob:` object URLs).
pub struct FetchMediaFetcher {
    window: Window,
    timeout: Duration,
}

impl FetchMediaFetcher {
    pub fn new() -> BridgeResult<Self> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> BridgeResult<Self> {
        Ok(Self {
            window: window()?,
            timeout,
        })
    }

    async fn fetch_with_timeout(&self, location: &str) -> BridgeResult<Response> {
        let controller =
            AbortController::new().map_err(|err| js_error("create abort controller", err))?;
        let init = RequestInit::new();
        init.set_method("GET");
        init.set_mode(RequestMode::Cors);
        init.set_signal(Some(&controller.signal()));

        let fetch = JsFuture::from(self.window.fetch_with_str_and_init(location, &init));
        let timeout_ms = self.timeout.as_millis().min(u32::MAX as u128) as u32;
        let timeout = TimeoutFuture::new(timeout_ms).map(|_| ());
        pin_mut!(fetch);
        pin_mut!(timeout);

        let result = match select(fetch, timeout).await {
            Either::Left((response, _)) => response,
            Either::Right((_, pending_fetch)) => {
                controller.abort();
                let _ = pending_fetch.await;
                return Err(BridgeError::OperationFailed(format!(
                    "fetch timed out after {} ms",
                    self.timeout.as_millis()
                )));
            }
        };

        result
            .map_err(|err| js_error("fetch", err))?
            .dyn_into::<Response>()
            .map_err(|_| BridgeError::OperationFailed("fetch returned non-Response".into()))
    }
}

#[async_trait(?Send)]
impl MediaFetcher for FetchMediaFetcher {
    async fn fetch(&self, location: &str) -> BridgeResult<Bytes> {
        let response = self.fetch_with_timeout(location).await?;
        if !response.ok() {
            return Err(BridgeError::OperationFailed(format!(
                "fetch returned HTTP {}",
                response.status()
            )));
        }

        let promise = response
            .array_buffer()
            .map_err(|err| js_error("response.array_buffer", err))?;
        let buffer = JsFuture::from(promise)
            .await
            .map_err(|err| js_error("response buffer", err))?;
        let array = Uint8Array::new(&buffer);
        let mut bytes = vec![0u8; array.length() as usize];
        array.copy_to(&mut bytes);

        debug!(bytes = bytes.len(), "Upload fetched");
        Ok(Bytes::from(bytes))
    }
}

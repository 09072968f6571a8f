//! Upload decoding with `decodeAudioData`.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    MediaDecoder, SampleBuffer,
};
use bytes::Bytes;
use js_sys::Uint8Array;
use tracing::debug;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioBuffer, AudioContext};

use crate::error::{js_error, js_message, WasmError};

/// Decodes whatever containers the browser supports.
///
/// The resulting buffer is already resampled to the context's rate.
pub struct WebAudioDecoder {
    context: AudioContext,
}

impl WebAudioDecoder {
    pub fn new(context: AudioContext) -> Self {
        Self { context }
    }
}

#[async_trait(?Send)]
impl MediaDecoder for WebAudioDecoder {
    async fn decode(&self, data: Bytes) -> BridgeResult<SampleBuffer> {
        let array = Uint8Array::from(data.as_ref());
        let promise = self
            .context
            .decode_audio_data(&array.buffer())
            .map_err(|err| js_error("decodeAudioData", err))?;
        let decoded = JsFuture::from(promise)
            .await
            .map_err(|err| BridgeError::from(WasmError::Unsupported(js_message(&err))))?
            .dyn_into::<AudioBuffer>()
            .map_err(|_| BridgeError::OperationFailed("decodeAudioData returned non-AudioBuffer".into()))?;

        let buffer = interleave(&decoded)?;
        debug!(
            channels = buffer.channels(),
            sample_rate = buffer.sample_rate(),
            duration_secs = buffer.duration_secs(),
            "Upload decoded"
        );
        Ok(buffer)
    }
}

fn interleave(decoded: &AudioBuffer) -> BridgeResult<SampleBuffer> {
    let channels = decoded.number_of_channels().max(1);
    let frames = decoded.length() as usize;
    let sample_rate = decoded.sample_rate() as u32;

    let planes = (0..channels)
        .map(|ch| {
            decoded
                .get_channel_data(ch)
                .map_err(|err| js_error("getChannelData", err))
        })
        .collect::<BridgeResult<Vec<Vec<f32>>>>()?;

    let mut samples = Vec::with_capacity(frames * planes.len());
    for frame in 0..frames {
        for plane in &planes {
            samples.push(plane.get(frame).copied().unwrap_or(0.0));
        }
    }
    Ok(SampleBuffer::interleaved(samples, sample_rate, channels as u16))
}

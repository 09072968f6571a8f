//! # Web Audio Output
//!
//! [`AudioOutput`] on a browser `AudioContext`.
//!
//! Each source is an `AudioBufferSourceNode` routed through its own
//! `GainNode`, so volume changes apply to the live source without a
//! restart. Browsers create contexts suspended until a user gesture; the
//! host calls [`AudioOutput::resume`] from a click handler.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    AudioOutput, EndedCallback, OutputState, SampleBuffer, SourceId, SourceRequest,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioBuffer, AudioBufferSourceNode, AudioContext, AudioContextState, GainNode};

use crate::error::js_error;

struct LiveNode {
    source: AudioBufferSourceNode,
    gain: GainNode,
}

impl LiveNode {
    fn halt(&self) {
        let _ = self.source.stop();
        let _ = self.gain.disconnect();
    }
}

type LiveNodes = Rc<RefCell<HashMap<SourceId, LiveNode>>>;

/// Audio output backed by one `AudioContext`.
pub struct WebAudioOutput {
    context: AudioContext,
    live: LiveNodes,
}

impl WebAudioOutput {
    /// Create a context with the browser's preferred sample rate.
    pub fn new() -> BridgeResult<Self> {
        let context = AudioContext::new().map_err(|err| js_error("create AudioContext", err))?;
        info!(sample_rate = context.sample_rate(), "AudioContext created");
        Ok(Self::with_context(context))
    }

    pub fn with_context(context: AudioContext) -> Self {
        Self {
            context,
            live: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// The underlying context, shared with the clock and decoder.
    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    fn build_buffer(&self, samples: &SampleBuffer) -> BridgeResult<AudioBuffer> {
        let channels = samples.channels().max(1) as usize;
        let frames = samples.frames().max(1);
        let buffer = self
            .context
            .create_buffer(channels as u32, frames as u32, samples.sample_rate() as f32)
            .map_err(|err| js_error("createBuffer", err))?;

        let interleaved = samples.samples();
        for channel in 0..channels {
            let mut plane: Vec<f32> = interleaved
                .iter()
                .skip(channel)
                .step_by(channels)
                .copied()
                .collect();
            plane.resize(frames, 0.0);
            buffer
                .copy_to_channel(&mut plane, channel as i32)
                .map_err(|err| js_error("copyToChannel", err))?;
        }
        Ok(buffer)
    }
}

#[async_trait(?Send)]
impl AudioOutput for WebAudioOutput {
    fn state(&self) -> OutputState {
        match self.context.state() {
            AudioContextState::Running => OutputState::Running,
            AudioContextState::Suspended => OutputState::Suspended,
            _ => OutputState::Closed,
        }
    }

    async fn resume(&self) -> BridgeResult<()> {
        let promise = self
            .context
            .resume()
            .map_err(|err| js_error("AudioContext.resume", err))?;
        JsFuture::from(promise)
            .await
            .map_err(|err| js_error("AudioContext.resume", err))?;
        match self.state() {
            OutputState::Closed => Err(BridgeError::NotAvailable(
                "AudioContext is closed".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn start(&self, request: SourceRequest, on_ended: EndedCallback) -> BridgeResult<()> {
        let buffer = self.build_buffer(&request.buffer)?;

        let source = self
            .context
            .create_buffer_source()
            .map_err(|err| js_error("createBufferSource", err))?;
        source.set_buffer(Some(&buffer));

        let gain = self
            .context
            .create_gain()
            .map_err(|err| js_error("createGain", err))?;
        gain.gain().set_value(request.gain.clamp(0.0, 1.0));

        source
            .connect_with_audio_node(&gain)
            .map_err(|err| js_error("connect source", err))?;
        gain.connect_with_audio_node(&self.context.destination())
            .map_err(|err| js_error("connect gain", err))?;

        let id = request.id;
        let live = Rc::clone(&self.live);
        let ended = Closure::once_into_js(move || {
            if let Some(node) = live.borrow_mut().remove(&id) {
                let _ = node.gain.disconnect();
            }
            on_ended(id);
        });
        source.set_onended(Some(ended.unchecked_ref()));

        source
            .start_with_when_and_grain_offset(0.0, request.offset_secs.max(0.0))
            .map_err(|err| js_error("start source", err))?;

        debug!(id = %id, offset = request.offset_secs, "Source started");
        self.live.borrow_mut().insert(id, LiveNode { source, gain });
        Ok(())
    }

    fn stop(&self, source: SourceId) -> BridgeResult<()> {
        // onended still fires after an explicit stop.
        let node = self.live.borrow_mut().remove(&source);
        if let Some(node) = node {
            node.halt();
        }
        Ok(())
    }

    fn set_gain(&self, source: SourceId, gain: f32) -> BridgeResult<()> {
        if let Some(node) = self.live.borrow().get(&source) {
            node.gain.gain().set_value(gain.clamp(0.0, 1.0));
        }
        Ok(())
    }
}

impl Drop for WebAudioOutput {
    fn drop(&mut self) {
        for (_, node) in self.live.borrow_mut().drain() {
            node.halt();
        }
        let _ = self.context.close();
    }
}

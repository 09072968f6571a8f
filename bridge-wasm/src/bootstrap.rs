//! Convenience helpers for wiring the browser bridges together.
//!
//! Host shells call [`build_web_bridges`] during startup and hand the
//! result to `core-service`, mirroring the defaults `bridge-desktop`
//! provides for native targets. Everything shares one `AudioContext`.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{
    error::Result as BridgeResult, AudioOutput, FrameScheduler, MediaDecoder, MediaFetcher,
    MonotonicClock,
};

use crate::{
    clock::AudioContextClock, decoder::WebAudioDecoder, fetch::FetchMediaFetcher,
    fetch::DEFAULT_FETCH_TIMEOUT, output::WebAudioOutput, scheduler::AnimationFrameScheduler,
};

/// Configuration for [`build_web_bridges`].
#[derive(Debug, Clone)]
pub struct WebBridgeConfig {
    /// Build the fetcher and decoder used for creator uploads.
    pub enable_uploads: bool,
    /// Per-download limit for uploads.
    pub fetch_timeout: Duration,
}

impl WebBridgeConfig {
    pub fn new() -> Self {
        Self {
            enable_uploads: true,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_uploads(mut self, enabled: bool) -> Self {
        self.enable_uploads = enabled;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

impl Default for WebBridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Browser bridge objects ready for injection into the core.
pub struct WebBridgeSet {
    /// Web Audio output; starts suspended until a user gesture.
    pub audio_output: Arc<dyn AudioOutput>,
    /// Clock following the output's `AudioContext`.
    pub clock: Arc<dyn MonotonicClock>,
    /// `requestAnimationFrame` scheduler.
    pub frame_scheduler: Arc<dyn FrameScheduler>,
    /// Present when uploads are enabled.
    pub media_fetcher: Option<Arc<dyn MediaFetcher>>,
    /// Present when uploads are enabled.
    pub media_decoder: Option<Arc<dyn MediaDecoder>>,
}

/// Build the default browser bridge stack.
pub fn build_web_bridges(config: WebBridgeConfig) -> BridgeResult<WebBridgeSet> {
    let output = WebAudioOutput::new()?;
    let clock: Arc<dyn MonotonicClock> = Arc::new(AudioContextClock::new(&output));
    let frame_scheduler: Arc<dyn FrameScheduler> = Arc::new(AnimationFrameScheduler::new()?);

    let (media_fetcher, media_decoder) = if config.enable_uploads {
        let fetcher: Arc<dyn MediaFetcher> =
            Arc::new(FetchMediaFetcher::with_timeout(config.fetch_timeout)?);
        let decoder: Arc<dyn MediaDecoder> =
            Arc::new(WebAudioDecoder::new(output.context().clone()));
        (Some(fetcher), Some(decoder))
    } else {
        (None, None)
    };

    Ok(WebBridgeSet {
        audio_output: Arc::new(output),
        clock,
        frame_scheduler,
        media_fetcher,
        media_decoder,
    })
}

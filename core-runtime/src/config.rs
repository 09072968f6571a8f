//! # Core Configuration Module
//!
//! Collects the host bridges and settings the playback core runs on.
//!
//! ## Overview
//!
//! [`CoreConfigBuilder`] gathers the bridges and validates them up front, so
//! a missing capability is reported when the host wires the core together
//! rather than on the first play request.
//!
//! ## Required Capabilities
//!
//! - `AudioOutput` - Output context (desktop default with `native-audio`: cpal)
//! - `MonotonicClock` - Playback timeline (desktop default: `Instant`)
//! - `FrameScheduler` - Progress loop ticks (desktop default: tokio timer)
//! - `ContentProvider` - Generated content; always supplied by the host
//!
//! ## Upload Capabilities
//!
//! - `MediaFetcher` / `MediaDecoder` - Required when
//!   [`FeatureFlags::enable_uploads`] is set (desktop defaults: tokio fs and
//!   symphonia)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .audio_output(Arc::new(WebAudioOutput::new()?))
//!     .clock(Arc::new(AudioContextClock::new(&output)))
//!     .frame_scheduler(Arc::new(AnimationFrameScheduler::new()))
//!     .content_provider(Arc::new(MyProvider::new(api_key)))
//!     .enable_uploads(false)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    AudioOutput, ContentProvider, FrameScheduler, MediaDecoder, MediaFetcher, MonotonicClock,
};
use std::sync::Arc;

/// Upper bound on the event channel capacity.
pub const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Bridges and settings for the playback core.
///
/// Use [`CoreConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    pub audio_output: Arc<dyn AudioOutput>,
    pub clock: Arc<dyn MonotonicClock>,
    pub frame_scheduler: Arc<dyn FrameScheduler>,
    pub content_provider: Arc<dyn ContentProvider>,
    /// Only present when uploads are enabled or explicitly injected.
    pub media_fetcher: Option<Arc<dyn MediaFetcher>>,
    pub media_decoder: Option<Arc<dyn MediaDecoder>>,
    pub features: FeatureFlags,
    /// Per-subscriber capacity of the event bus.
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("audio_output", &"AudioOutput { ... }")
            .field("clock", &"MonotonicClock { ... }")
            .field("frame_scheduler", &"FrameScheduler { ... }")
            .field("content_provider", &"ContentProvider { ... }")
            .field(
                "media_fetcher",
                &self.media_fetcher.as_ref().map(|_| "MediaFetcher { ... }"),
            )
            .field(
                "media_decoder",
                &self.media_decoder.as_ref().map(|_| "MediaDecoder { ... }"),
            )
            .field("features", &self.features)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

/// Optional functionality toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// Allow playing creator uploads (requires a fetcher and a decoder).
    pub enable_uploads: bool,
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Check settings and feature flags against the injected bridges.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {MAX_EVENT_BUFFER_SIZE}"
            )));
        }

        if self.features.enable_uploads && self.media_fetcher.is_none() {
            return Err(Error::missing(
                "MediaFetcher",
                "Uploads enabled but no MediaFetcher provided. \
                 Disable uploads or inject a MediaFetcher implementation.",
            ));
        }

        if self.features.enable_uploads && self.media_decoder.is_none() {
            return Err(Error::missing(
                "MediaDecoder",
                "Uploads enabled but no MediaDecoder provided. \
                 Disable uploads or inject a MediaDecoder implementation.",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Platform defaults
// ============================================================================

#[cfg(feature = "native-audio")]
fn provide_default_audio_output() -> Result<Arc<dyn AudioOutput>> {
    let output = bridge_desktop::CpalAudioOutput::new().map_err(|e| {
        Error::missing(
            "AudioOutput",
            format!("Default cpal output could not open an output device: {e}"),
        )
    })?;
    Ok(Arc::new(output))
}

#[cfg(not(feature = "native-audio"))]
fn provide_default_audio_output() -> Result<Arc<dyn AudioOutput>> {
    Err(Error::missing(
        "AudioOutput",
        "AudioOutput implementation is required to emit sound. \
         Desktop: enable the 'native-audio' feature to use CpalAudioOutput. \
         Web: inject WebAudioOutput from bridge-wasm.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_clock() -> Result<Arc<dyn MonotonicClock>> {
    Ok(Arc::new(bridge_desktop::InstantClock::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_clock() -> Result<Arc<dyn MonotonicClock>> {
    Err(Error::missing(
        "MonotonicClock",
        "MonotonicClock implementation is required for progress tracking. \
         Desktop: ensure the 'desktop-shims' feature is enabled. \
         Web: inject AudioContextClock so progress follows the output context.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_frame_scheduler() -> Result<Arc<dyn FrameScheduler>> {
    let scheduler = bridge_desktop::TokioFrameScheduler::try_current().map_err(|e| {
        Error::missing(
            "FrameScheduler",
            format!("Default tokio scheduler needs a running runtime: {e}"),
        )
    })?;
    Ok(Arc::new(scheduler))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_frame_scheduler() -> Result<Arc<dyn FrameScheduler>> {
    Err(Error::missing(
        "FrameScheduler",
        "FrameScheduler implementation is required for the progress loop. \
         Desktop: ensure the 'desktop-shims' feature is enabled. \
         Web: inject AnimationFrameScheduler.",
    ))
}

fn content_provider_missing_error() -> Error {
    Error::missing(
        "ContentProvider",
        "ContentProvider implementation is required to generate station audio. \
         Inject a client for the text-to-speech service; no default is shipped.",
    )
}

type UploadBridges = (
    Option<Arc<dyn MediaFetcher>>,
    Option<Arc<dyn MediaDecoder>>,
);

#[cfg(feature = "desktop-shims")]
fn resolve_upload_bridges(
    features: FeatureFlags,
    fetcher: Option<Arc<dyn MediaFetcher>>,
    decoder: Option<Arc<dyn MediaDecoder>>,
) -> UploadBridges {
    if !features.enable_uploads {
        return (fetcher, decoder);
    }
    let fetcher = fetcher.unwrap_or_else(|| {
        Arc::new(bridge_desktop::TokioMediaFetcher::new()) as Arc<dyn MediaFetcher>
    });
    let decoder = decoder.unwrap_or_else(|| {
        Arc::new(bridge_desktop::SymphoniaMediaDecoder::new()) as Arc<dyn MediaDecoder>
    });
    (Some(fetcher), Some(decoder))
}

#[cfg(not(feature = "desktop-shims"))]
fn resolve_upload_bridges(
    _features: FeatureFlags,
    fetcher: Option<Arc<dyn MediaFetcher>>,
    decoder: Option<Arc<dyn MediaDecoder>>,
) -> UploadBridges {
    (fetcher, decoder)
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    audio_output: Option<Arc<dyn AudioOutput>>,
    clock: Option<Arc<dyn MonotonicClock>>,
    frame_scheduler: Option<Arc<dyn FrameScheduler>>,
    content_provider: Option<Arc<dyn ContentProvider>>,
    media_fetcher: Option<Arc<dyn MediaFetcher>>,
    media_decoder: Option<Arc<dyn MediaDecoder>>,
    features: FeatureFlags,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    pub fn audio_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.audio_output = Some(output);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn MonotonicClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn frame_scheduler(mut self, scheduler: Arc<dyn FrameScheduler>) -> Self {
        self.frame_scheduler = Some(scheduler);
        self
    }

    pub fn content_provider(mut self, provider: Arc<dyn ContentProvider>) -> Self {
        self.content_provider = Some(provider);
        self
    }

    pub fn media_fetcher(mut self, fetcher: Arc<dyn MediaFetcher>) -> Self {
        self.media_fetcher = Some(fetcher);
        self
    }

    pub fn media_decoder(mut self, decoder: Arc<dyn MediaDecoder>) -> Self {
        self.media_decoder = Some(decoder);
        self
    }

    pub fn enable_uploads(mut self, enabled: bool) -> Self {
        self.features.enable_uploads = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`].
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Resolve defaults, then validate.
    ///
    /// # Errors
    ///
    /// [`Error::CapabilityMissing`] names the first absent bridge that has
    /// no platform default; [`Error::Config`] reports invalid settings.
    pub fn build(self) -> Result<CoreConfig> {
        let content_provider = self
            .content_provider
            .ok_or_else(content_provider_missing_error)?;

        let audio_output = match self.audio_output {
            Some(output) => output,
            None => provide_default_audio_output()?,
        };

        let clock = match self.clock {
            Some(clock) => clock,
            None => provide_default_clock()?,
        };

        let frame_scheduler = match self.frame_scheduler {
            Some(scheduler) => scheduler,
            None => provide_default_frame_scheduler()?,
        };

        let (media_fetcher, media_decoder) =
            resolve_upload_bridges(self.features, self.media_fetcher, self.media_decoder);

        let config = CoreConfig {
            audio_output,
            clock,
            frame_scheduler,
            content_provider,
            media_fetcher,
            media_decoder,
            features: self.features,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{
        EndedCallback, FrameCallback, FrameHandle, GeneratedContent, GenerationRequest,
        OutputState, SampleBuffer, SourceId, SourceRequest,
    };
    use bytes::Bytes;

    struct StubOutput;

    #[async_trait]
    impl AudioOutput for StubOutput {
        fn state(&self) -> OutputState {
            OutputState::Running
        }

        async fn resume(&self) -> BridgeResult<()> {
            Ok(())
        }

        fn start(&self, _request: SourceRequest, _on_ended: EndedCallback) -> BridgeResult<()> {
            Ok(())
        }

        fn stop(&self, _source: SourceId) -> BridgeResult<()> {
            Ok(())
        }

        fn set_gain(&self, _source: SourceId, _gain: f32) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct StubClock;

    impl MonotonicClock for StubClock {
        fn now_secs(&self) -> f64 {
            0.0
        }
    }

    struct StubScheduler;

    impl FrameScheduler for StubScheduler {
        fn request_frame(&self, _callback: FrameCallback) -> FrameHandle {
            FrameHandle::new(1)
        }

        fn cancel_frame(&self, _handle: FrameHandle) {}
    }

    struct StubProvider;

    #[async_trait]
    impl ContentProvider for StubProvider {
        async fn generate(&self, _request: &GenerationRequest) -> BridgeResult<GeneratedContent> {
            Ok(GeneratedContent::default())
        }
    }

    struct StubFetcher;

    #[async_trait]
    impl MediaFetcher for StubFetcher {
        async fn fetch(&self, _location: &str) -> BridgeResult<Bytes> {
            Ok(Bytes::new())
        }
    }

    struct StubDecoder;

    #[async_trait]
    impl MediaDecoder for StubDecoder {
        async fn decode(&self, _data: Bytes) -> BridgeResult<SampleBuffer> {
            Ok(SampleBuffer::empty(24_000))
        }
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .audio_output(Arc::new(StubOutput))
            .clock(Arc::new(StubClock))
            .frame_scheduler(Arc::new(StubScheduler))
            .content_provider(Arc::new(StubProvider))
    }

    fn missing_capability(err: Error) -> String {
        match err {
            Error::CapabilityMissing { capability, .. } => capability,
            other => panic!("expected CapabilityMissing, got {other:?}"),
        }
    }

    #[test]
    fn builds_with_all_bridges() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(!config.features.enable_uploads);
        assert!(config.media_fetcher.is_none());
    }

    #[test]
    fn content_provider_is_always_required() {
        let err = CoreConfig::builder()
            .audio_output(Arc::new(StubOutput))
            .clock(Arc::new(StubClock))
            .frame_scheduler(Arc::new(StubScheduler))
            .build()
            .unwrap_err();
        assert_eq!(missing_capability(err), "ContentProvider");
    }

    #[cfg(not(feature = "native-audio"))]
    #[test]
    fn audio_output_has_no_default_without_native_audio() {
        let err = CoreConfig::builder()
            .content_provider(Arc::new(StubProvider))
            .clock(Arc::new(StubClock))
            .frame_scheduler(Arc::new(StubScheduler))
            .build()
            .unwrap_err();
        let message = err.to_string();
        assert_eq!(missing_capability(err), "AudioOutput");
        assert!(message.contains("native-audio"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn clock_is_required_without_desktop_shims() {
        let err = CoreConfig::builder()
            .content_provider(Arc::new(StubProvider))
            .audio_output(Arc::new(StubOutput))
            .frame_scheduler(Arc::new(StubScheduler))
            .build()
            .unwrap_err();
        assert_eq!(missing_capability(err), "MonotonicClock");
    }

    #[cfg(feature = "desktop-shims")]
    #[tokio::test]
    async fn desktop_shims_fill_clock_scheduler_and_uploads() {
        let config = CoreConfig::builder()
            .content_provider(Arc::new(StubProvider))
            .audio_output(Arc::new(StubOutput))
            .enable_uploads(true)
            .build()
            .unwrap();
        assert!(config.media_fetcher.is_some());
        assert!(config.media_decoder.is_some());
        assert!(config.clock.now_secs() >= 0.0);
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn uploads_require_fetcher_and_decoder() {
        let err = complete_builder().enable_uploads(true).build().unwrap_err();
        assert_eq!(missing_capability(err), "MediaFetcher");

        let err = complete_builder()
            .enable_uploads(true)
            .media_fetcher(Arc::new(StubFetcher))
            .build()
            .unwrap_err();
        assert_eq!(missing_capability(err), "MediaDecoder");
    }

    #[test]
    fn injected_upload_bridges_are_kept() {
        let config = complete_builder()
            .features(FeatureFlags {
                enable_uploads: true,
            })
            .media_fetcher(Arc::new(StubFetcher))
            .media_decoder(Arc::new(StubDecoder))
            .build()
            .unwrap();
        assert!(config.media_fetcher.is_some());
        assert!(config.media_decoder.is_some());
    }

    #[test]
    fn event_buffer_size_is_bounded() {
        let err = complete_builder().event_buffer_size(0).build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = complete_builder()
            .event_buffer_size(MAX_EVENT_BUFFER_SIZE + 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let config = complete_builder().event_buffer_size(16).build().unwrap();
        assert_eq!(config.event_buffer_size, 16);
    }

    #[test]
    fn debug_output_hides_bridges() {
        let config = complete_builder().build().unwrap();
        let debug = format!("{config:?}");
        assert!(debug.contains("AudioOutput { ... }"));
        assert!(debug.contains("event_buffer_size: 100"));
    }
}

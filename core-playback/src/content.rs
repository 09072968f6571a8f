//! # Content Resolver
//!
//! Turns a [`MediaItem`] into a decoded [`SampleBuffer`].
//!
//! Generated items go through the [`ContentProvider`] and the PCM decoder;
//! uploads are fetched with a [`MediaFetcher`] and decoded by the platform
//! [`MediaDecoder`]. The resolver holds no session state: whether a result
//! is still wanted is decided by the caller's request token.

use bridge_traits::{
    ContentProvider, GenerationRequest, MediaDecoder, MediaFetcher, SampleBuffer,
};
use core_runtime::logging::strip_path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::decoder::PcmDecoder;
use crate::error::{PlaybackError, Result};
use crate::track::{MediaItem, SourceKind};

/// Decoded content ready for the player.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContent {
    pub buffer: SampleBuffer,
    /// Script behind generated speech; `None` for uploads.
    pub script: Option<String>,
}

/// Fetches and decodes content for media items.
pub struct ContentResolver {
    provider: Arc<dyn ContentProvider>,
    fetcher: Option<Arc<dyn MediaFetcher>>,
    decoder: Option<Arc<dyn MediaDecoder>>,
    pcm: PcmDecoder,
    default_voice: String,
    uploads_enabled: bool,
}

impl ContentResolver {
    pub fn new(provider: Arc<dyn ContentProvider>, pcm: PcmDecoder, default_voice: impl Into<String>) -> Self {
        Self {
            provider,
            fetcher: None,
            decoder: None,
            pcm,
            default_voice: default_voice.into(),
            uploads_enabled: false,
        }
    }

    /// Enable uploads through the given bridges.
    pub fn with_uploads(
        mut self,
        fetcher: Arc<dyn MediaFetcher>,
        decoder: Arc<dyn MediaDecoder>,
    ) -> Self {
        self.fetcher = Some(fetcher);
        self.decoder = Some(decoder);
        self.uploads_enabled = true;
        self
    }

    pub fn uploads_enabled(&self) -> bool {
        self.uploads_enabled && self.fetcher.is_some() && self.decoder.is_some()
    }

    /// Acquire and decode the audio for `item`.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::Provider`] when generation or fetching fails
    /// - [`PlaybackError::ContentUnavailable`] when no audio came back or
    ///   uploads are not configured
    /// - [`PlaybackError::Decode`] when the payload cannot be decoded
    #[instrument(skip(self, item), fields(item_id = %item.id, source = item.source.label()))]
    pub async fn resolve(&self, item: &MediaItem) -> Result<ResolvedContent> {
        match &item.source {
            SourceKind::Generated { prompt, .. } => {
                let voice = item.voice_or(&self.default_voice);
                self.resolve_generated(&item.id, prompt, voice).await
            }
            SourceKind::Uploaded { url } => self.resolve_upload(url).await,
        }
    }

    async fn resolve_generated(&self, item_id: &str, prompt: &str, voice: &str) -> Result<ResolvedContent> {
        let request = GenerationRequest::new(item_id, prompt, voice);
        debug!(voice, prompt_len = prompt.len(), "Requesting generated content");

        let content = self
            .provider
            .generate(&request)
            .await
            .map_err(|e| PlaybackError::Provider(e.to_string()))?;

        let payload = content.audio().ok_or_else(|| {
            warn!(script_len = content.script.len(), "Provider returned no audio");
            PlaybackError::ContentUnavailable("No audio data received".to_string())
        })?;

        let buffer = self.pcm.decode(payload)?;
        info!(
            samples = buffer.len(),
            duration_secs = buffer.duration_secs(),
            "Generated content decoded"
        );

        let script = Some(content.script).filter(|s| !s.trim().is_empty());
        Ok(ResolvedContent { buffer, script })
    }

    async fn resolve_upload(&self, url: &str) -> Result<ResolvedContent> {
        let (fetcher, decoder) = match (&self.fetcher, &self.decoder) {
            (Some(fetcher), Some(decoder)) if self.uploads_enabled => (fetcher, decoder),
            _ => {
                return Err(PlaybackError::ContentUnavailable(
                    "uploads are not enabled: configure a media fetcher and decoder".to_string(),
                ))
            }
        };

        let file = strip_path(url);
        debug!(file, "Fetching upload");

        let bytes = fetcher
            .fetch(url)
            .await
            .map_err(|e| PlaybackError::Provider(format!("failed to fetch {file}: {e}")))?;

        if bytes.is_empty() {
            return Err(PlaybackError::ContentUnavailable(format!("{file} is empty")));
        }

        let size = bytes.len();
        let buffer = decoder
            .decode(bytes)
            .await
            .map_err(|e| PlaybackError::Decode(format!("{file}: {e}")))?;

        info!(
            file,
            bytes = size,
            channels = buffer.channels(),
            sample_rate = buffer.sample_rate(),
            duration_secs = buffer.duration_secs(),
            "Upload decoded"
        );
        Ok(ResolvedContent {
            buffer,
            script: None,
        })
    }
}

impl std::fmt::Debug for ContentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentResolver")
            .field("pcm", &self.pcm)
            .field("default_voice", &self.default_voice)
            .field("uploads_enabled", &self.uploads_enabled())
            .finish()
    }
}

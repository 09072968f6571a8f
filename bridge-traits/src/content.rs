//! Content acquisition traits.
//!
//! Generated content comes from an opaque [`ContentProvider`] (the hosted
//! text-to-speech service); uploaded media is fetched as bytes by a
//! [`MediaFetcher`] and turned into samples by a platform [`MediaDecoder`].
//! The core never talks to the network itself.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{error::Result, platform::PlatformSendSync, playback::SampleBuffer};

/// Parameters of one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Id of the item being generated, for log correlation.
    pub item_id: String,
    /// Free-form prompt describing the segment.
    pub prompt: String,
    /// Prebuilt voice name for the speech synthesis step.
    pub voice: String,
}

impl GenerationRequest {
    pub fn new(
        item_id: impl Into<String>,
        prompt: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            prompt: prompt.into(),
            voice: voice.into(),
        }
    }
}

/// Result of a generation call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneratedContent {
    /// Script text the audio was synthesized from.
    pub script: String,
    /// Base64 raw PCM16 LE mono payload. `None` when the service produced
    /// text but no audio.
    pub audio_base64: Option<String>,
}

impl GeneratedContent {
    pub fn new(script: impl Into<String>, audio_base64: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            audio_base64: Some(audio_base64.into()),
        }
    }

    /// Audio payload if present and non-blank.
    pub fn audio(&self) -> Option<&str> {
        self.audio_base64
            .as_deref()
            .filter(|payload| !payload.trim().is_empty())
    }
}

/// Generative content service.
///
/// Calls may take seconds. They are never cancelled by the core; a result
/// that arrives after the user moved on is simply discarded.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait ContentProvider: PlatformSendSync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedContent>;
}

/// Retrieves the raw bytes of uploaded media.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaFetcher: PlatformSendSync {
    /// Fetch the resource at `location` (URL or host-specific path).
    async fn fetch(&self, location: &str) -> Result<Bytes>;
}

/// Decodes a container/codec payload (mp3, wav, ogg, ...) into samples.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaDecoder: PlatformSendSync {
    async fn decode(&self, data: Bytes) -> Result<SampleBuffer>;
}

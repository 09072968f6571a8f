//! Playback bridge traits and supporting audio types.
//!
//! These abstractions let the core playback module drive a platform audio
//! engine (Web Audio in the browser, cpal on desktop) without knowing how
//! the engine renders samples. Host applications provide a concrete
//! [`AudioOutput`]; the core owns every decision about *when* sources start
//! and stop.

use crate::{error::Result, platform::PlatformSendSync};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Playback lifecycle status exposed to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackStatus {
    /// Nothing is playing. Initial state, and the state after completion.
    #[default]
    Idle,
    /// A play request is waiting on the content provider.
    AwaitingContent,
    /// A source is live on the output.
    Playing,
    /// Playback is halted with a captured resume offset.
    Paused,
    /// The last request failed; a message is available.
    Error,
}

impl PlaybackStatus {
    /// Returns `true` when a decoded track is loaded and can be toggled.
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackStatus::Playing | PlaybackStatus::Paused)
    }

    /// Stable upper-case name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "IDLE",
            PlaybackStatus::AwaitingContent => "AWAITING_CONTENT",
            PlaybackStatus::Playing => "PLAYING",
            PlaybackStatus::Paused => "PAUSED",
            PlaybackStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable block of decoded PCM samples in the range `[-1.0, 1.0]`.
///
/// Multi-channel buffers are interleaved (LRLR...). The duration is always
/// derived from the frame count and the sample rate, never stored, so it can
/// not drift from the data. Samples are shared behind an `Arc`, which makes
/// cloning cheap and in-place mutation impossible.
#[derive(Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl SampleBuffer {
    /// Create a single-channel buffer.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::interleaved(samples, sample_rate, 1)
    }

    /// Create a buffer from interleaved samples.
    ///
    /// A trailing partial frame is dropped. A channel count of zero is
    /// treated as mono.
    pub fn interleaved(mut samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels as usize;
        samples.truncate(frames * channels as usize);
        Self {
            samples: samples.into(),
            sample_rate,
            channels,
        }
    }

    /// A buffer with no samples.
    pub fn empty(sample_rate: u32) -> Self {
        Self::mono(Vec::new(), sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Total number of samples across all channels.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds, `frames / sample_rate`.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs())
    }

    /// Frame index corresponding to `offset_secs`, clamped to the buffer.
    pub fn frame_at(&self, offset_secs: f64) -> usize {
        if !offset_secs.is_finite() || offset_secs <= 0.0 {
            return 0;
        }
        let frame = (offset_secs * self.sample_rate as f64).floor() as usize;
        frame.min(self.frames())
    }
}

impl fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("samples", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("duration_secs", &self.duration_secs())
            .finish()
    }
}

/// Identifier of one started output source.
///
/// A fresh id is allocated for every `start`, so a late notification from a
/// stopped source can always be told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(u64);

impl SourceId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source-{}", self.0)
    }
}

/// State of the host output context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    /// Output can start sources immediately.
    Running,
    /// The environment is holding output back (e.g. browser autoplay policy)
    /// until the context is resumed from a user gesture.
    Suspended,
    /// The context was torn down and can no longer play.
    Closed,
}

/// Everything an output needs to start emitting one buffer.
#[derive(Debug, Clone)]
pub struct SourceRequest {
    /// Id the ended notification must carry.
    pub id: SourceId,
    /// Samples to play.
    pub buffer: SampleBuffer,
    /// Position inside `buffer` to start from, in seconds.
    pub offset_secs: f64,
    /// Initial gain multiplier in `0.0..=1.0`.
    pub gain: f32,
}

/// Callback invoked when a source stops emitting.
#[cfg(not(target_arch = "wasm32"))]
pub type EndedCallback = Box<dyn FnOnce(SourceId) + Send + 'static>;

#[cfg(target_arch = "wasm32")]
pub type EndedCallback = Box<dyn FnOnce(SourceId) + 'static>;

/// Platform audio output context.
///
/// One instance is constructed explicitly by the host and handed to the
/// core; there is no process-wide singleton.
///
/// # Ended notifications
///
/// `start` receives a callback that must be invoked at most once, when the
/// source stops producing sound. Implementations may invoke it after an
/// explicit `stop` as well (Web Audio's `onended` does): the core only
/// treats it as natural completion when the id is still the live source.
/// The callback may run on any thread.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait AudioOutput: PlatformSendSync {
    /// Current state of the output context.
    fn state(&self) -> OutputState;

    /// Resume a suspended context. Hosts call this from a user gesture.
    async fn resume(&self) -> Result<()>;

    /// Begin emitting `request.buffer` from `request.offset_secs`.
    fn start(&self, request: SourceRequest, on_ended: EndedCallback) -> Result<()>;

    /// Halt a source immediately. Unknown ids are ignored.
    fn stop(&self, source: SourceId) -> Result<()>;

    /// Change the gain of a live source without restarting it.
    fn set_gain(&self, source: SourceId, gain: f32) -> Result<()>;
}

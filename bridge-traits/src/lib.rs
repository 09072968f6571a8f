//! # Host Bridge Traits
//!
//! Capability contracts the playback core needs from its host.
//!
//! ## Overview
//!
//! The core decides *what* plays and *when*; the host decides *how* sound
//! reaches the speakers, how time is measured and where content comes from.
//! Each of those concerns is a trait here, implemented by `bridge-desktop`
//! for native builds and `bridge-wasm` for the browser.
//!
//! ## Traits
//!
//! ### Audio
//! - [`AudioOutput`](playback::AudioOutput) - Output context that starts, stops and re-gains sources
//! - [`MonotonicClock`](time::MonotonicClock) - Shared timeline for elapsed-time math
//! - [`FrameScheduler`](scheduler::FrameScheduler) - One-shot display-frame callbacks for progress
//!
//! ### Content
//! - [`ContentProvider`](content::ContentProvider) - Generated script + PCM audio
//! - [`MediaFetcher`](content::MediaFetcher) - Bytes of uploaded media
//! - [`MediaDecoder`](content::MediaDecoder) - Container/codec decoding to samples
//!
//! ### Utilities
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! Missing required capabilities are reported when the core is configured,
//! not when the first play request arrives:
//!
//! ```ignore
//! let output = config.audio_output
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "AudioOutput".to_string(),
//!         message: "No audio output provided. \
//!                  Desktop: enable the `native-audio` feature. \
//!                  Web: inject WebAudioOutput.".to_string(),
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! On native targets every trait is `Send + Sync` so the core can be shared
//! across tokio tasks. On `wasm32` the bounds are dropped; see
//! [`platform`].

pub mod content;
pub mod error;
pub mod platform;
pub mod playback;
pub mod scheduler;
pub mod time;

pub use error::BridgeError;

pub use content::{ContentProvider, GeneratedContent, GenerationRequest, MediaDecoder, MediaFetcher};
pub use platform::{PlatformSend, PlatformSendSync};
pub use playback::{
    AudioOutput, EndedCallback, OutputState, PlaybackStatus, SampleBuffer, SourceId, SourceRequest,
};
pub use scheduler::{FrameCallback, FrameHandle, FrameScheduler};
#[cfg(not(target_arch = "wasm32"))]
pub use time::SystemClock;
pub use time::{ConsoleLogger, LogEntry, LogLevel, LoggerSink, MonotonicClock};

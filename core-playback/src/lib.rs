//! # Playback Core
//!
//! Turns content requests into audible playback.
//!
//! ## Overview
//!
//! This crate handles:
//! - Decoding base64 PCM16 payloads from the content provider
//! - Driving a single live output source against a monotonic clock
//! - The playback state machine (request, pause/resume, completion, errors)
//! - Resolving generated and uploaded content
//! - The async [`Player`] that ties these to the event bus and the frame
//!   scheduler
//!
//! Platform capabilities (audio output, clock, frame scheduling, network,
//! container decoding) are injected through `bridge-traits`.

pub mod config;
pub mod content;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod format;
pub mod player;
pub mod session;
pub mod track;

pub use config::PlayerConfig;
pub use content::{ContentResolver, ResolvedContent};
pub use controller::GraphController;
pub use decoder::{PcmDecoder, SampleBuffer, PCM_SAMPLE_RATE};
pub use error::{PlaybackError, Result};
pub use format::format_time;
pub use player::{PlayOutcome, Player};
pub use session::{Completion, PlaybackSession, RequestDecision};
pub use track::{MediaItem, PlaybackTrack, SourceKind};

pub use bridge_traits::PlaybackStatus;

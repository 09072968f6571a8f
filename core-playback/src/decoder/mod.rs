//! # PCM Decoder Module
//!
//! Turns the generated-content payload into a [`SampleBuffer`].
//!
//! ## Payload format
//!
//! The content provider returns speech as base64 text wrapping headerless
//! PCM:
//!
//! | Property | Value |
//! |----------|-------|
//! | Encoding | signed 16-bit little-endian |
//! | Channels | 1 |
//! | Rate     | 24 000 Hz ([`PCM_SAMPLE_RATE`]) |
//!
//! Nothing in the payload states the rate, so it is a contract constant,
//! configurable through `PlayerConfig::sample_rate`.
//!
//! ## Failure policy
//!
//! Invalid base64 is an error ([`PlaybackError::Decode`](crate::PlaybackError::Decode)).
//! The session turns it into the `ERROR` status with the standard user
//! message, so a corrupt payload is visible instead of silently playing
//! nothing. A trailing odd byte is not an error: it is dropped and logged.
//!
//! ```rust
//! use core_playback::decoder::PcmDecoder;
//!
//! let decoder = PcmDecoder::default();
//! let buffer = decoder.decode("AAAAAA==").unwrap();
//! assert_eq!(buffer.len(), 2);
//! assert_eq!(buffer.samples(), &[0.0, 0.0]);
//! ```

mod pcm;

pub use pcm::{pcm16le_to_f32, PcmDecoder, PCM_SAMPLE_RATE};

pub use bridge_traits::SampleBuffer;

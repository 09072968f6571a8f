//! # Desktop Bridge Implementations
//!
//! Host capabilities for native builds (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - [`InstantClock`] - `MonotonicClock` on the tokio timeline
//! - [`TokioFrameScheduler`] - `FrameScheduler` driving progress updates from tokio tasks
//! - [`TokioMediaFetcher`] - `MediaFetcher` for local paths and `http(s)` URLs via `reqwest`
//! - [`SymphoniaMediaDecoder`] - `MediaDecoder` for common containers via `symphonia`
//! - `CpalAudioOutput` - `AudioOutput` on the default device via `cpal`
//!
//! ## Feature Flags
//!
//! - `native-audio`: Enable `CpalAudioOutput` (pulls in `cpal` and the host audio libraries)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{InstantClock, TokioFrameScheduler, CpalAudioOutput};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let output = Arc::new(CpalAudioOutput::new()?);
//!     let clock = Arc::new(InstantClock::new());
//!     let scheduler = Arc::new(TokioFrameScheduler::try_current()?);
//!
//!     // Hand these to CoreConfig::builder()
//!     Ok(())
//! }
//! ```

mod clock;
mod decoder;
mod fetch;
#[cfg_attr(not(feature = "native-audio"), allow(dead_code))]
mod mixer;
mod scheduler;

#[cfg(feature = "native-audio")]
mod output;

pub use clock::InstantClock;
pub use decoder::{decode_all, SymphoniaMediaDecoder};
pub use fetch::TokioMediaFetcher;
pub use scheduler::{TokioFrameScheduler, DEFAULT_FRAME_INTERVAL};

#[cfg(feature = "native-audio")]
pub use output::CpalAudioOutput;

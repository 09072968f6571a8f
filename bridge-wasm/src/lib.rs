//! WebAssembly Bridge Implementations
//!
//! Browser implementations of the bridge traits defined in `bridge-traits`,
//! built on Web Audio, `fetch` and `requestAnimationFrame` through
//! `web-sys` and `wasm-bindgen`.
//!
//! # Platform Support
//!
//! This crate is designed exclusively for the `wasm32-unknown-unknown` target.
//! It will not compile for native targets.
//!
//! # Implementations
//!
//! - `WebAudioOutput`: `AudioOutput` over an `AudioContext`
//! - `AudioContextClock` / `PerformanceClock`: `MonotonicClock`
//! - `AnimationFrameScheduler`: `FrameScheduler`
//! - `FetchMediaFetcher`: `MediaFetcher` via `fetch`
//! - `WebAudioDecoder`: `MediaDecoder` via `decodeAudioData`
//! - `JsContentProvider`: `ContentProvider` delegating to a JS function
//!
//! # Examples
//!
//! ```ignore
//! use bridge_wasm::{build_web_bridges, WebBridgeConfig};
//!
//! let bridges = build_web_bridges(WebBridgeConfig::new())?;
//! // Later, from a click handler:
//! bridges.audio_output.resume().await?;
//! ```

#![cfg(target_arch = "wasm32")]

pub mod bootstrap;
pub mod clock;
pub mod decoder;
pub mod error;
pub mod fetch;
pub mod output;
pub mod provider;
pub mod scheduler;

pub use bootstrap::{build_web_bridges, WebBridgeConfig, WebBridgeSet};
pub use clock::{AudioContextClock, PerformanceClock};
pub use decoder::WebAudioDecoder;
pub use error::{WasmError, WasmResult};
pub use fetch::FetchMediaFetcher;
pub use output::WebAudioOutput;
pub use provider::JsContentProvider;
pub use scheduler::AnimationFrameScheduler;

//! Workspace façade crate.
//!
//! This crate exposes feature flags that map onto the individual workspace
//! crates (`core-service`, `core-playback`). Host applications can depend on
//! `ncor-workspace` and enable the documented features without wiring each
//! crate individually.

#[cfg(any(feature = "desktop-shims", feature = "wasm"))]
pub use core_service;

#[cfg(feature = "playback-only")]
pub use core_playback;

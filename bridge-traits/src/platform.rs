//! Platform-specific marker traits that keep bridge bounds aligned with the
//! threading guarantees of each target.
//!
//! Native hosts share bridges across tokio tasks and audio threads, so every
//! bridge must be `Send + Sync`. Browser builds run on a single thread and
//! hold `web_sys` handles (`AudioContext`, `GainNode`, ...) that cannot
//! satisfy those bounds, so the markers collapse to no-ops on `wasm32`.

/// Marker trait that applies `Send + Sync` on native targets while becoming a
/// no-op on `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSendSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSendSync for T where T: Send + Sync {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSendSync {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSendSync for T {}

/// Marker trait equivalent to `Send` on native targets.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSend: Send {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSend for T where T: Send {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSend {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSend for T {}

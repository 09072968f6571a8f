//! Frame scheduling abstraction.
//!
//! The progress loop never owns a timer. It asks the host for "the next
//! display frame" and is called back once; the browser maps this onto
//! `requestAnimationFrame`, desktop onto a tokio sleep, tests onto a queue
//! that is flushed by hand.

use crate::platform::PlatformSendSync;
use std::fmt;

/// Token returned by [`FrameScheduler::request_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame-{}", self.0)
    }
}

/// One-shot callback run on the next frame.
#[cfg(not(target_arch = "wasm32"))]
pub type FrameCallback = Box<dyn FnOnce() + Send + 'static>;

#[cfg(target_arch = "wasm32")]
pub type FrameCallback = Box<dyn FnOnce() + 'static>;

/// Host frame scheduler.
///
/// Callbacks are one-shot: a loop that wants to keep running must request a
/// new frame from inside its callback. Callbacks never run inside
/// `request_frame` itself. A cancelled handle's callback must not run.
/// Cancelling a handle that already fired is a no-op.
pub trait FrameScheduler: PlatformSendSync {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle;

    fn cancel_frame(&self, handle: FrameHandle);
}

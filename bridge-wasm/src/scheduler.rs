//! Progress ticks on `requestAnimationFrame`.

use bridge_traits::{error::Result as BridgeResult, FrameCallback, FrameHandle, FrameScheduler};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Window;

use crate::error::window;

/// Schedules frame callbacks with the browser's animation frame loop.
///
/// Background tabs get no frames, so progress stops updating while hidden
/// and catches up on the next visible frame.
pub struct AnimationFrameScheduler {
    window: Window,
    next_id: Cell<u64>,
    /// Our handle -> browser request id, for frames not yet delivered.
    pending: Rc<RefCell<HashMap<u64, i32>>>,
}

impl AnimationFrameScheduler {
    pub fn new() -> BridgeResult<Self> {
        Ok(Self {
            window: window()?,
            next_id: Cell::new(1),
            pending: Rc::new(RefCell::new(HashMap::new())),
        })
    }

    pub fn pending_frames(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl FrameScheduler for AnimationFrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let pending = Rc::clone(&self.pending);
        let tick = Closure::once_into_js(move |_timestamp: f64| {
            // Cancelled frames stay out of the map even if the browser fires.
            if pending.borrow_mut().remove(&id).is_some() {
                callback();
            }
        });

        match self
            .window
            .request_animation_frame(tick.unchecked_ref::<js_sys::Function>())
        {
            Ok(raf_id) => {
                self.pending.borrow_mut().insert(id, raf_id);
            }
            Err(err) => warn!(error = ?err, "requestAnimationFrame failed"),
        }
        FrameHandle::new(id)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        if let Some(raf_id) = self.pending.borrow_mut().remove(&handle.get()) {
            let _ = self.window.cancel_animation_frame(raf_id);
        }
    }
}

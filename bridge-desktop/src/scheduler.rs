//! Frame scheduling on the tokio runtime.

use bridge_traits::{
    error::{BridgeError, Result},
    FrameCallback, FrameHandle, FrameScheduler,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

/// Roughly one 60 Hz display frame.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Runs each frame callback on a tokio task after a fixed interval.
pub struct TokioFrameScheduler {
    runtime: Handle,
    interval: Duration,
    next_id: AtomicU64,
    pending: Arc<Mutex<HashMap<u64, JoinHandle<()>>>>,
}

impl TokioFrameScheduler {
    /// Bind to the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotAvailable`] outside a tokio runtime.
    pub fn try_current() -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| BridgeError::NotAvailable(format!("tokio runtime: {e}")))?;
        Ok(Self::with_handle(runtime, DEFAULT_FRAME_INTERVAL))
    }

    pub fn with_handle(runtime: Handle, interval: Duration) -> Self {
        Self {
            runtime,
            interval,
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Frames requested and not yet fired or cancelled.
    pub fn pending_frames(&self) -> usize {
        self.pending.lock().len()
    }
}

impl FrameScheduler for TokioFrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let interval = self.interval;
        let pending = self.pending.clone();

        // Held until the handle is recorded so the task cannot remove its
        // entry first.
        let mut guard = self.pending.lock();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            if pending.lock().remove(&id).is_some() {
                callback();
            }
        });
        guard.insert(id, task);

        trace!(frame = id, "Frame requested");
        FrameHandle::new(id)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        if let Some(task) = self.pending.lock().remove(&handle.get()) {
            task.abort();
            trace!(%handle, "Frame cancelled");
        }
    }
}

impl std::fmt::Debug for TokioFrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioFrameScheduler")
            .field("interval", &self.interval)
            .field("pending", &self.pending_frames())
            .finish()
    }
}

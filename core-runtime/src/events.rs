//! # Event Bus System
//!
//! Typed broadcast events for the playback core, built on
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The player publishes every lifecycle change here: status transitions,
//! start / pause / resume / stop / completion, periodic position updates,
//! and the progress of content requests. Hosts subscribe to drive their UI
//! (the player bar, a "generating..." indicator, error toasts) without
//! polling.
//!
//! ```text
//! ┌──────────┐   emit    ┌───────────┐   subscribe   ┌────────────┐
//! │  Player  ├──────────>│ EventBus  ├──────────────>│ Player bar │
//! └──────────┘           │(broadcast)│               └────────────┘
//!                        │           │   subscribe   ┌────────────┐
//!                        │           ├──────────────>│ Toasts     │
//!                        └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Completed {
//!     item_id: "station-1".to_string(),
//! }))
//! .ok();
//!
//! let event = rx.recv().await.unwrap();
//! assert_eq!(event.description(), "Playback completed");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Position
//!   updates are frequent, so UI subscribers should tolerate this and keep
//!   reading.
//! - **`RecvError::Closed`**: every sender was dropped; the player is gone.

use bridge_traits::PlaybackStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default per-subscriber buffer.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Content(ContentEvent),
}

impl CoreEvent {
    /// Short human-readable description.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Content(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Content(ContentEvent::Discarded { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Started { .. })
            | CoreEvent::Playback(PlaybackEvent::Completed { .. })
            | CoreEvent::Content(ContentEvent::Ready { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Item the event refers to, when there is one.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            CoreEvent::Playback(e) => e.item_id(),
            CoreEvent::Content(e) => Some(e.item_id()),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Playback lifecycle events.
///
/// Positions and durations are milliseconds so the payloads stay `Eq` and
/// serialize without float noise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The session moved between two statuses.
    StatusChanged {
        from: PlaybackStatus,
        to: PlaybackStatus,
        /// Current item after the transition.
        item_id: Option<String>,
    },
    /// Decoded content started playing from the beginning.
    Started {
        item_id: String,
        title: String,
        duration_ms: u64,
    },
    Paused {
        item_id: String,
        position_ms: u64,
    },
    Resumed {
        item_id: String,
        position_ms: u64,
    },
    /// Playback was halted by the caller.
    Stopped {
        item_id: String,
        position_ms: u64,
    },
    /// The buffer played to its end on its own.
    Completed {
        item_id: String,
    },
    /// Periodic progress while playing.
    PositionChanged {
        item_id: String,
        position_ms: u64,
        duration_ms: u64,
    },
    /// Session volume changed (percent, 0-100).
    VolumeChanged {
        volume_percent: u8,
        muted: bool,
    },
    Error {
        item_id: Option<String>,
        /// Message suitable for display.
        message: String,
        /// Whether retrying the same request can succeed.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::StatusChanged { .. } => "Playback status changed",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Completed { .. } => "Playback completed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::VolumeChanged { .. } => "Volume changed",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }

    fn item_id(&self) -> Option<&str> {
        match self {
            PlaybackEvent::StatusChanged { item_id, .. } | PlaybackEvent::Error { item_id, .. } => {
                item_id.as_deref()
            }
            PlaybackEvent::Started { item_id, .. }
            | PlaybackEvent::Paused { item_id, .. }
            | PlaybackEvent::Resumed { item_id, .. }
            | PlaybackEvent::Stopped { item_id, .. }
            | PlaybackEvent::Completed { item_id }
            | PlaybackEvent::PositionChanged { item_id, .. } => Some(item_id),
            PlaybackEvent::VolumeChanged { .. } => None,
        }
    }
}

// ============================================================================
// Content Events
// ============================================================================

/// Progress of content requests (generation or upload fetch).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ContentEvent {
    /// A request was sent to the provider or fetcher.
    Requested {
        item_id: String,
        token: u64,
        /// `"generated"` or `"uploaded"`.
        source: String,
    },
    /// Content arrived and decoded for the pending request.
    Ready {
        item_id: String,
        token: u64,
        duration_ms: u64,
    },
    /// A result arrived for a request that is no longer pending.
    Discarded {
        item_id: String,
        token: u64,
        reason: String,
    },
}

impl ContentEvent {
    fn description(&self) -> &str {
        match self {
            ContentEvent::Requested { .. } => "Content requested",
            ContentEvent::Ready { .. } => "Content ready",
            ContentEvent::Discarded { .. } => "Stale content discarded",
        }
    }

    fn item_id(&self) -> &str {
        match self {
            ContentEvent::Requested { item_id, .. }
            | ContentEvent::Ready { item_id, .. }
            | ContentEvent::Discarded { item_id, .. } => item_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast bus. Cloning yields another sender on the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Create a bus; `capacity` is the per-subscriber backlog before
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all subscribers. Fails only when nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// New receiver for future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::default();
/// let errors_only = EventStream::new(bus.subscribe())
///     .filter(|event| event.severity() >= core_runtime::events::EventSeverity::Error);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Next matching event.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drain every matching event already queued.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

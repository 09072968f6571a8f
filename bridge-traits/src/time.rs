//! Clock and log-forwarding abstractions.
//!
//! Playback position is measured against a [`MonotonicClock`] that the host
//! injects. In the browser that is `AudioContext.currentTime`, on desktop a
//! process-local `Instant`, and in tests a manually advanced fake.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{error::Result, platform::PlatformSendSync};

/// Monotonic time source in seconds.
///
/// Values only need to be comparable with each other; the epoch is
/// arbitrary. Implementations must never go backwards.
///
/// ```ignore
/// use bridge_traits::time::MonotonicClock;
///
/// fn elapsed_since(clock: &dyn MonotonicClock, start: f64) -> f64 {
///     clock.now_secs() - start
/// }
/// ```
pub trait MonotonicClock: PlatformSendSync {
    /// Current time in seconds since an arbitrary fixed origin.
    fn now_secs(&self) -> f64;
}

/// Clock backed by [`std::time::Instant`], anchored at construction.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl MonotonicClock for SystemClock {
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Severity of a forwarded log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// Structured log record handed to a [`LoggerSink`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Module path that emitted the record.
    pub target: String,
    pub message: String,
    /// Structured fields, ordered by key.
    pub fields: BTreeMap<String, String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Forwards core log records into a host logging pipeline (browser console,
/// desktop log file, test capture).
///
/// Records never contain provider API keys; the core redacts them before
/// they reach a sink.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait LoggerSink: PlatformSendSync {
    async fn log(&self, entry: LogEntry) -> Result<()>;

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Records below this level are dropped before forwarding.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Sink that prints to stdout. Useful for demos and tests.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

impl ConsoleLogger {
    fn render(entry: &LogEntry) -> String {
        let mut line = format!(
            "[{}] {} {}: {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.level,
            entry.target,
            entry.message
        );
        for (key, value) in &entry.fields {
            line.push_str(&format!(" {key}={value}"));
        }
        line
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl LoggerSink for ConsoleLogger {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level >= self.min_level {
            println!("{}", Self::render(&entry));
        }
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

//! # Logging & Tracing Infrastructure
//!
//! Structured logging for the playback core, built on `tracing`:
//! - Pretty, JSON and compact output formats
//! - Per-crate filtering with an `EnvFilter`
//! - Redaction helpers for provider credentials and upload locations
//! - Optional mirroring of every event into a host [`LoggerSink`]
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::time::{ConsoleLogger, LogLevel};
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use std::sync::Arc;
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Compact)
//!     .with_level(LogLevel::Debug)
//!     .with_logger_sink(Arc::new(ConsoleLogger::default()));
//!
//! init_logging(config)?;
//! tracing::info!(item_id = "station-1", "Playback started");
//! ```
//!
//! ## Redaction
//!
//! The content provider is authenticated with an API key and uploaded media
//! may live behind signed URLs. Neither may reach a log line verbatim: pass
//! such values through [`redact_if_sensitive`] or [`strip_path`].

use crate::error::{Error, Result};
use bridge_traits::time::{LogLevel, LoggerSink};
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use bridge_traits::time::LogEntry;
#[cfg(not(target_arch = "wasm32"))]
use std::collections::BTreeMap;
#[cfg(not(target_arch = "wasm32"))]
use std::fmt;
#[cfg(not(target_arch = "wasm32"))]
use tracing::field::{Field, Visit};
#[cfg(not(target_arch = "wasm32"))]
use tracing::{Event, Subscriber};
#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::format::FmtSpan,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer, Registry,
};

/// Crates whose events pass the default filter at the configured level.
const WORKSPACE_TARGETS: &[&str] = &[
    "ncor_workspace",
    "core_runtime",
    "core_playback",
    "core_service",
    "bridge_desktop",
    "bridge_wasm",
];

/// Noisy dependencies capped at `warn` by the default filter.
const QUIET_TARGETS: &[&str] = &["symphonia_core", "symphonia_format_isomp4", "cpal"];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output
    Pretty,
    /// One JSON object per event
    Json,
    /// Single-line output
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Logging configuration
#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Minimum level for workspace crates.
    pub level: LogLevel,
    /// Custom filter directive, e.g. `"core_playback=trace"`. Replaces the
    /// default per-crate filter entirely.
    pub filter: Option<String>,
    /// Host sink receiving a copy of every event that passes the filter.
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Emit span enter/exit events (pretty) or span lists (JSON).
    pub enable_spans: bool,
    pub display_target: bool,
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            enable_spans: false,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl std::fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("has_logger_sink", &self.logger_sink.is_some())
            .field("enable_spans", &self.enable_spans)
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }

    /// Filter directive this config resolves to.
    pub fn filter_directive(&self) -> String {
        if let Some(custom) = &self.filter {
            return custom.clone();
        }

        let level = level_name(self.level);
        WORKSPACE_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .chain(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")))
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

/// Install the global subscriber.
///
/// Call once at startup. A second call fails with [`Error::Config`] because
/// a global subscriber is already set.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.filter_directive())
        .map_err(|e| Error::Config(format!("Invalid log filter: {e}")))?;

    tracing_subscriber::registry()
        .with(fmt_layer(&config))
        .with(LoggerSinkLayer::new(config.logger_sink.clone()))
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {e}")))
}

#[cfg(not(target_arch = "wasm32"))]
fn fmt_layer(config: &LoggingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let base = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_writer(std::io::stdout);

    match config.format {
        LogFormat::Pretty => base
            .pretty()
            .with_span_events(if config.enable_spans {
                FmtSpan::ACTIVE
            } else {
                FmtSpan::NONE
            })
            .boxed(),
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(config.enable_spans)
            .boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

/// Browser builds write to the devtools console through `tracing-wasm`.
/// The format options and host sink do not apply there.
#[cfg(target_arch = "wasm32")]
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let max_level = match config.level {
        LogLevel::Trace => tracing::Level::TRACE,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Error => tracing::Level::ERROR,
    };
    let wasm_config = tracing_wasm::WASMLayerConfigBuilder::new()
        .set_max_level(max_level)
        .build();

    tracing_subscriber::registry()
        .with(tracing_wasm::WASMLayer::new(wasm_config))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {e}")))
}

/// Layer that mirrors events into a [`LoggerSink`].
#[cfg(not(target_arch = "wasm32"))]
struct LoggerSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
}

#[cfg(not(target_arch = "wasm32"))]
impl LoggerSinkLayer {
    fn new(sink: Option<Arc<dyn LoggerSink>>) -> Self {
        Self { sink }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl<S> Layer<S> for LoggerSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        let metadata = event.metadata();
        let level = log_level_of(*metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut visitor = SinkVisitor::default();
        event.record(&mut visitor);

        let message = visitor
            .message
            .unwrap_or_else(|| metadata.name().to_string());
        let mut entry = LogEntry::new(level, metadata.target(), message);
        entry.fields = visitor.fields;
        if let Some(span) = ctx.lookup_current() {
            entry = entry.with_field("span", span.name());
        }

        let sink = Arc::clone(sink);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = sink.log(entry).await {
                        eprintln!("LoggerSink error: {err}");
                    }
                });
            }
            Err(_) => {
                if let Err(err) = futures::executor::block_on(sink.log(entry)) {
                    eprintln!("LoggerSink error: {err}");
                }
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(Default)]
struct SinkVisitor {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

#[cfg(not(target_arch = "wasm32"))]
impl SinkVisitor {
    fn record_value(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Visit for SinkVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, format!("{value:?}"));
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn log_level_of(level: tracing::Level) -> LogLevel {
    match level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

/// Redact a field value when its name marks it as a credential.
///
/// ```ignore
/// use core_runtime::logging::redact_if_sensitive;
///
/// tracing::debug!(api_key = %redact_if_sensitive("api_key", &key), "Provider configured");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    const SENSITIVE_FIELDS: &[&str] = &[
        "api_key",
        "api-key",
        "apikey",
        "token",
        "secret",
        "password",
        "authorization",
        "bearer",
        "signature",
    ];

    let field_lower = field_name.to_lowercase();
    if SENSITIVE_FIELDS.iter().any(|f| field_lower.contains(f)) {
        return "[REDACTED]".to_string();
    }

    match value.find('@') {
        Some(at) if value[at..].contains('.') => {
            format!("{}***@[REDACTED]", &value[..1.min(at)])
        }
        _ => value.to_string(),
    }
}

/// Reduce a path or URL to its last segment.
///
/// Query strings and fragments are dropped first since signed upload URLs
/// carry credentials there.
///
/// ```ignore
/// use core_runtime::logging::strip_path;
///
/// assert_eq!(strip_path("https://cdn.example/u/ep-1.mp3?sig=abc"), "ep-1.mp3");
/// ```
pub fn strip_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

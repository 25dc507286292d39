//! # Logging
//!
//! Installs the process-wide `tracing` subscriber for a client host.
//!
//! The client crates log at the configured level; HTTP and SQLite internals
//! are held at `warn`. Output goes to stdout as pretty text in debug builds
//! and as flattened JSON lines in release builds. A host that has its own log
//! surface attaches a [`LoggerSink`] and receives every event that passes the
//! filter.
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LoggingConfig};
//! use bridge_traits::logger::LogLevel;
//!
//! init_logging(LoggingConfig::default().with_level(LogLevel::Debug))?;
//! tracing::info!(book = "dune.m4b", "Book opened");
//! ```
//!
//! On `wasm32` the host console is the only surface; [`init_logging`] is a
//! no-op there.

use crate::error::Result;
use bridge_traits::logger::{LogLevel, LoggerSink};
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use crate::error::Error;
#[cfg(not(target_arch = "wasm32"))]
use bridge_traits::logger::LogEntry;
#[cfg(not(target_arch = "wasm32"))]
use std::fmt;
#[cfg(not(target_arch = "wasm32"))]
use tracing::field::{Field, Visit};
#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::{
    filter::EnvFilter,
    layer::{Context, SubscriberExt},
    util::SubscriberInitExt,
    Layer,
};

/// Crates whose events follow the configured level.
pub const CLIENT_CRATES: &[&str] = &[
    "audiobook_client",
    "bridge_desktop",
    "core_library",
    "core_playback",
    "core_runtime",
    "core_service",
    "core_sync",
];

const QUIET_DEPENDENCIES: &str = "h2=warn,hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,sqlx=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human readable.
    Pretty,
    /// One JSON object per event, fields flattened.
    Json,
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

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level for the client crates.
    pub level: LogLevel,
    /// Full `EnvFilter` directive string; replaces the level-based default.
    pub filter: Option<String>,
    pub sink: Option<Arc<dyn LoggerSink>>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            sink: None,
        }
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

    pub fn with_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Filter directives this configuration installs.
    pub fn directives(&self) -> String {
        match &self.filter {
            Some(filter) => filter.clone(),
            None => {
                let level = self.level.as_str();
                CLIENT_CRATES
                    .iter()
                    .map(|krate| format!("{krate}={level}"))
                    .chain(std::iter::once(QUIET_DEPENDENCIES.to_string()))
                    .collect::<Vec<_>>()
                    .join(",")
            }
        }
    }
}

impl std::fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// `Config` for an unparsable filter, `Logging` when a subscriber is
/// already installed.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.directives())
        .map_err(|e| Error::Config(format!("Invalid log filter: {e}")))?;

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(config.sink.clone().map(SinkLayer));
    let output = tracing_subscriber::fmt::layer().with_target(true);

    let installed = match config.format {
        LogFormat::Pretty => registry.with(output.pretty()).try_init(),
        LogFormat::Json => registry
            .with(output.json().flatten_event(true).with_current_span(true))
            .try_init(),
    };
    installed.map_err(|e| Error::Logging(e.to_string()))
}

#[cfg(target_arch = "wasm32")]
pub fn init_logging(_config: LoggingConfig) -> Result<()> {
    Ok(())
}

/// Forwards events to the host sink.
#[cfg(not(target_arch = "wasm32"))]
struct SinkLayer(Arc<dyn LoggerSink>);

#[cfg(not(target_arch = "wasm32"))]
impl<S: tracing::Subscriber> Layer<S> for SinkLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = match *metadata.level() {
            tracing::Level::TRACE => LogLevel::Trace,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::ERROR => LogLevel::Error,
        };
        if level < self.0.min_level() {
            return;
        }

        let mut entry = LogEntry::new(level, metadata.target(), String::new());
        event.record(&mut EntryVisitor(&mut entry));
        self.0.log(&entry);
    }
}

#[cfg(not(target_arch = "wasm32"))]
struct EntryVisitor<'a>(&'a mut LogEntry);

#[cfg(not(target_arch = "wasm32"))]
impl EntryVisitor<'_> {
    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.0.message = value;
        } else {
            self.0.fields.insert(field.name().to_string(), value);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Visit for EntryVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}

//! Logging demonstration
//!
//! Emits the kind of structured events the core produces while a book is
//! played and its position synchronized, mirrored to a host sink.
//!
//! ```bash
//! cargo run --example logging_demo
//! cargo run --example logging_demo -- json "core_sync=trace"
//! ```

use bridge_traits::logger::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::env;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Stands in for a platform log such as Logcat.
struct StderrSink;

impl LoggerSink for StderrSink {
    fn log(&self, entry: &LogEntry) {
        eprintln!(
            "[host {}] {} {}",
            entry.level.as_str(),
            entry.book().unwrap_or("-"),
            entry.message
        );
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Warn
    }
}

#[tokio::main]
async fn main() -> core_runtime::Result<()> {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Debug)
        .with_sink(Arc::new(StderrSink));
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    init_logging(config)?;
    info!(format = ?format, "Logging initialized");

    open_book("dune.m4b").await;
    sync_positions("dune.m4b", 3).await;
    Ok(())
}

#[instrument]
async fn open_book(book: &str) {
    debug!(bytes = 48_213_004u64, "Playing cached copy");
    info!(book, resumed_at = 1800.0, "Book opened");
}

#[instrument]
async fn sync_positions(book: &str, records: usize) {
    warn!(book, status = 503, "Position sync failed, keeping local records");
    tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    debug!(records, "Positions synchronized");
}

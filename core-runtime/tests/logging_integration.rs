//! Global subscriber installation. Only one test in this binary may install
//! the subscriber.

use bridge_traits::logger::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct HostLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl LoggerSink for HostLog {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[test]
fn test_installed_subscriber_forwards_client_events() {
    let host = Arc::new(HostLog::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug)
        .with_sink(host.clone());
    init_logging(config).unwrap();

    tracing::info!(target: "core_service::player", book = "dune.m4b", "Book opened");
    tracing::debug!(target: "core_sync::reconciler", "Dispatching position sync");
    tracing::info!(target: "sqlx::query", "SELECT 1");

    {
        let entries = host.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Book opened");
        assert_eq!(entries[0].book(), Some("dune.m4b"));
    }

    assert!(matches!(
        init_logging(LoggingConfig::default()),
        Err(Error::Logging(_))
    ));
}

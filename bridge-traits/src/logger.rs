//! Host log forwarding.
//!
//! Native log surfaces (os_log, Logcat, the browser console) are synchronous,
//! so entries are handed over by reference on the emitting thread.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::platform::PlatformSendSync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// One event from the core, flattened for a host logger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    /// Emitting module, e.g. `core_sync::reconciler`.
    pub target: String,
    pub message: String,
    /// Structured fields in key order.
    pub fields: BTreeMap<String, String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            target: target.into(),
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The book the event concerns, when it was logged with one.
    pub fn book(&self) -> Option<&str> {
        self.field("book")
    }
}

/// Receives core log events on behalf of the host.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::logger::{LogEntry, LoggerSink};
///
/// struct Logcat;
///
/// impl LoggerSink for Logcat {
///     fn log(&self, entry: &LogEntry) {
///         android_log(entry.level, &entry.target, &entry.message);
///     }
/// }
/// ```
pub trait LoggerSink: PlatformSendSync {
    fn log(&self, entry: &LogEntry);

    /// Entries below this level are not built at all.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::Warn.as_str(), "warn");
    }

    #[test]
    fn test_entry_fields() {
        let entry = LogEntry::new(LogLevel::Warn, "core_sync::reconciler", "Position sync failed")
            .with_field("book", "dune.m4b")
            .with_field("status", "503");

        assert_eq!(entry.book(), Some("dune.m4b"));
        assert_eq!(entry.field("status"), Some("503"));
        assert_eq!(entry.field("missing"), None);
        assert_eq!(
            entry.fields.keys().collect::<Vec<_>>(),
            vec!["book", "status"]
        );
    }
}

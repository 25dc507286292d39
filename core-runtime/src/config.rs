//! # Client Configuration
//!
//! Settings shared by every component of the audiobook client: where the
//! remote library lives, where the local store is kept, and the timing
//! constants that drive position tracking and transport controls.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::builder()
//!     .base_url("https://books.example.com")
//!     .database_path("/var/lib/audiobooks/client.db")
//!     .sync_interval(Duration::from_secs(15))
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(
//!     config.endpoints().metadata("Dune.m4b"),
//!     "https://books.example.com/v1/books/Dune.m4b/metadata"
//! );
//! ```
//!
//! ## Defaults
//!
//! | Setting | Default |
//! |---------|---------|
//! | `base_url` | empty (relative URLs) |
//! | `database_path` | none (in-memory store) |
//! | `new_position_delay` | 5 s |
//! | `sync_interval` | 10 s |
//! | `skip_back_tolerance` | 5 s |
//! | `jump_step` | 30 s |
//! | `event_buffer_size` | 100 |

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use std::path::PathBuf;
use std::time::Duration;

/// Gap after a seek or skip beyond which a new position record is started.
pub const DEFAULT_NEW_POSITION_DELAY: Duration = Duration::from_millis(5_000);

/// Minimum time between opportunistic position pushes.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_millis(10_000);

/// Seconds after a chapter boundary during which "previous" lands on that
/// boundary.
pub const DEFAULT_SKIP_BACK_TOLERANCE: f64 = 5.0;

/// Seconds moved by the seek-forward/seek-backward media actions.
pub const DEFAULT_JUMP_STEP: f64 = 30.0;

/// Client configuration. Build with [`ClientConfig::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Origin of the book server, without trailing slash. Empty for relative
    /// URLs.
    pub base_url: String,

    /// SQLite database file. `None` keeps the local store in memory.
    pub database_path: Option<PathBuf>,

    pub new_position_delay: Duration,

    pub sync_interval: Duration,

    pub skip_back_tolerance: f64,

    pub jump_step: f64,

    /// Capacity of the core event bus.
    pub event_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            database_path: None,
            new_position_delay: DEFAULT_NEW_POSITION_DELAY,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            skip_back_tolerance: DEFAULT_SKIP_BACK_TOLERANCE,
            jump_step: DEFAULT_JUMP_STEP,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The base URL, when set, is an http(s) origin
    /// - Timing durations are non-zero
    /// - Second-based steps are finite and non-negative
    /// - The event buffer holds at least one event
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.is_empty()
            && !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://"))
        {
            return Err(Error::Config(format!(
                "Base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }

        if let Some(path) = &self.database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        if self.new_position_delay.is_zero() {
            return Err(Error::Config(
                "New position delay must be greater than zero".to_string(),
            ));
        }

        if self.sync_interval.is_zero() {
            return Err(Error::Config(
                "Sync interval must be greater than zero".to_string(),
            ));
        }

        if !self.skip_back_tolerance.is_finite() || self.skip_back_tolerance < 0.0 {
            return Err(Error::Config(format!(
                "Skip-back tolerance must be a non-negative number of seconds, got {}",
                self.skip_back_tolerance
            )));
        }

        if !self.jump_step.is_finite() || self.jump_step <= 0.0 {
            return Err(Error::Config(format!(
                "Jump step must be a positive number of seconds, got {}",
                self.jump_step
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn endpoints(&self) -> ApiEndpoints {
        ApiEndpoints::new(self.base_url.clone())
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Server origin, e.g. `https://books.example.com`. A trailing slash is
    /// stripped.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.config.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.database_path = Some(path.into());
        self
    }

    pub fn new_position_delay(mut self, delay: Duration) -> Self {
        self.config.new_position_delay = delay;
        self
    }

    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.config.sync_interval = interval;
        self
    }

    pub fn skip_back_tolerance(mut self, seconds: f64) -> Self {
        self.config.skip_back_tolerance = seconds;
        self
    }

    pub fn jump_step(mut self, seconds: f64) -> Self {
        self.config.jump_step = seconds;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.config.event_buffer_size = size;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Remote URL layout of the book server.
///
/// Book identifiers are percent-encoded as a single path segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiEndpoints {
    base_url: String,
}

impl ApiEndpoints {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET` library listing.
    pub fn books(&self) -> String {
        format!("{}/v1/books", self.base_url)
    }

    /// `GET` book audio. Also the streaming source URL.
    pub fn book(&self, book: &str) -> String {
        format!("{}/v1/books/{}", self.base_url, urlencoding::encode(book))
    }

    /// `GET` chapter and format metadata.
    pub fn metadata(&self, book: &str) -> String {
        format!("{}/metadata", self.book(book))
    }

    /// `GET` cover image.
    pub fn cover(&self, book: &str) -> String {
        format!("{}/cover", self.book(book))
    }

    /// `PATCH` position sync.
    pub fn positions(&self, book: &str) -> String {
        format!("{}/positions", self.book(book))
    }
}

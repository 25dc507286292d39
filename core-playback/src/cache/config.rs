//! Cache configuration and policies

use bridge_traits::http::RetryPolicy;
use std::time::Duration;

/// Configuration for the book cache manager.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Timeout for a whole-book download (default: 600s)
    pub download_timeout: Duration,

    /// Timeout for a cover fetch (default: 30s)
    pub cover_timeout: Duration,

    /// Largest book payload accepted, `None` for no limit
    pub max_book_bytes: Option<u64>,

    /// Re-fetch the cover whenever a cached book is viewed (default: true)
    pub refresh_covers: bool,

    /// Retry policy for whole-book downloads
    pub retry_policy: RetryPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            download_timeout: Duration::from_secs(600),
            cover_timeout: Duration::from_secs(30),
            max_book_bytes: None,
            refresh_covers: true,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set download timeout.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Set cover fetch timeout.
    pub fn with_cover_timeout(mut self, timeout: Duration) -> Self {
        self.cover_timeout = timeout;
        self
    }

    /// Limit the size of a single cached book.
    pub fn with_max_book_bytes(mut self, bytes: u64) -> Self {
        self.max_book_bytes = Some(bytes);
        self
    }

    /// Enable or disable the lazy cover refresh.
    pub fn with_cover_refresh(mut self, enabled: bool) -> Self {
        self.refresh_covers = enabled;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.download_timeout.is_zero() {
            return Err("download_timeout must be greater than 0".to_string());
        }

        if self.cover_timeout.is_zero() {
            return Err("cover_timeout must be greater than 0".to_string());
        }

        if self.max_book_bytes == Some(0) {
            return Err("max_book_bytes must be greater than 0".to_string());
        }

        if self.retry_policy.max_attempts == 0 {
            return Err("retry_policy.max_attempts must be at least 1".to_string());
        }

        Ok(())
    }
}

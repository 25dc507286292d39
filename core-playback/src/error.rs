//! # Playback Error Types
//!
//! Errors raised by the playback engine and the book cache.

use bridge_traits::error::BridgeError;
use core_library::error::LibraryError;
use thiserror::Error;

/// Errors that can occur during playback and caching operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Remote source answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    SourceUnavailable { status: u16, url: String },

    // ========================================================================
    // Cache Errors
    // ========================================================================
    /// A download for the same book is already in flight.
    #[error("Download already in progress: {0}")]
    DownloadInProgress(String),

    /// Downloaded payload exceeds the configured limit.
    #[error("Book {book} is {bytes} bytes, limit is {limit}")]
    PayloadTooLarge { book: String, bytes: u64, limit: u64 },

    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Wrapped Errors
    // ========================================================================
    /// Host media or network bridge failed.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Local store failure.
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::SourceUnavailable { status, .. } => *status >= 500,
            PlaybackError::Bridge(_) => true,
            PlaybackError::Library(e) => e.is_network_error(),
            _ => false,
        }
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        match self {
            PlaybackError::SourceUnavailable { .. } | PlaybackError::Bridge(_) => true,
            PlaybackError::Library(e) => e.is_network_error(),
            _ => false,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let server = PlaybackError::SourceUnavailable {
            status: 503,
            url: "/v1/books/a".to_string(),
        };
        assert!(server.is_transient());
        assert!(server.is_network_error());

        let missing = PlaybackError::SourceUnavailable {
            status: 404,
            url: "/v1/books/a".to_string(),
        };
        assert!(!missing.is_transient());
        assert!(missing.is_network_error());

        let busy = PlaybackError::DownloadInProgress("a".to_string());
        assert!(!busy.is_transient());
        assert!(!busy.is_network_error());

        let offline = PlaybackError::from(BridgeError::OperationFailed("offline".into()));
        assert!(offline.is_network_error());
    }
}

//! # Book Cache
//!
//! Whole-book audio and cover images are downloaded on request and kept in
//! the local store for offline playback.
//!
//! ## Features
//!
//! - Explicit cache and remove of a book's audio
//! - Lazy cover refresh whenever a cached book is viewed
//! - Per-book download tracking for the player's cache button
//! - Cache events on the core event bus

mod config;
mod manager;

pub use config::CacheConfig;
pub use manager::CacheManager;

use serde::{Deserialize, Serialize};

/// Local availability of a book's audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheState {
    Cached,
    NotCached,
    Downloading,
}

impl CacheState {
    /// Label for the player's cache button.
    pub fn action_text(self) -> &'static str {
        match self {
            CacheState::Cached => "Remove book from player",
            CacheState::NotCached => "Download book to player",
            CacheState::Downloading => "Downloading",
        }
    }

    /// Material icon name for the player's cache button.
    pub fn icon(self) -> &'static str {
        match self {
            CacheState::Cached => "file_download_done",
            CacheState::NotCached => "file_download",
            CacheState::Downloading => "downloading",
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, CacheState::Cached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_state_presentation() {
        assert_eq!(CacheState::Cached.action_text(), "Remove book from player");
        assert_eq!(CacheState::NotCached.action_text(), "Download book to player");
        assert_eq!(CacheState::Downloading.action_text(), "Downloading");
        assert_eq!(CacheState::Cached.icon(), "file_download_done");
        assert!(CacheState::Cached.is_available());
        assert!(!CacheState::Downloading.is_available());
    }
}

//! # Book Cache Manager
//!
//! Downloads whole books and their covers into the local store, answers
//! "is this book cached" queries and removes cached audio on request.
//!
//! Position history and covers are never removed together with a book's
//! audio.

use crate::cache::{CacheConfig, CacheState};
use crate::error::{PlaybackError, Result};
use bridge_traits::http::{HttpClient, HttpRequest};
use core_library::models::{BookAsset, CoverAsset, PositionRecord};
use core_library::repositories::LocalStore;
use core_runtime::config::ApiEndpoints;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Book cache manager.
pub struct CacheManager {
    config: CacheConfig,
    http: Arc<dyn HttpClient>,
    store: LocalStore,
    endpoints: ApiEndpoints,
    event_bus: Option<EventBus>,
    downloading: Mutex<HashSet<String>>,
}

impl CacheManager {
    /// Create a new cache manager.
    ///
    /// # Arguments
    ///
    /// * `config` - Cache configuration
    /// * `http` - HTTP client used for book and cover downloads
    /// * `store` - Local store holding cached books, covers and positions
    /// * `endpoints` - Remote URL layout
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use core_playback::cache::{CacheConfig, CacheManager};
    ///
    /// let manager = CacheManager::new(CacheConfig::default(), http, store, endpoints)?;
    /// let book = manager.cache_book("dune.m4b").await?;
    /// ```
    pub fn new(
        config: CacheConfig,
        http: Arc<dyn HttpClient>,
        store: LocalStore,
        endpoints: ApiEndpoints,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::InvalidConfig)?;
        Ok(Self {
            config,
            http,
            store,
            endpoints,
            event_bus: None,
            downloading: Mutex::new(HashSet::new()),
        })
    }

    /// Set event bus for cache events.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    // ========================================================================
    // Books
    // ========================================================================

    /// Download a book's audio and store it, overwriting any earlier copy.
    ///
    /// # Errors
    ///
    /// Fails on a network error, a non-success response, an oversized
    /// payload, a concurrent download of the same book or a store failure.
    /// Nothing is stored on failure.
    #[instrument(skip(self))]
    pub async fn cache_book(&self, book: &str) -> Result<BookAsset> {
        let _guard = DownloadGuard::acquire(&self.downloading, book)?;
        self.emit(CacheEvent::DownloadStarted {
            book: book.to_string(),
        });

        match self.download_book(book).await {
            Ok(asset) => {
                info!(bytes = asset.size(), "Book cached");
                self.emit(CacheEvent::Cached {
                    book: book.to_string(),
                    bytes: asset.size(),
                });
                Ok(asset)
            }
            Err(e) => {
                warn!(error = %e, "Book download failed");
                self.emit(CacheEvent::DownloadFailed {
                    book: book.to_string(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn download_book(&self, book: &str) -> Result<BookAsset> {
        let url = self.endpoints.book(book);
        let request = HttpRequest::get(url.clone()).timeout(self.config.download_timeout);
        let response = self
            .http
            .execute_with_retry(request, self.config.retry_policy.clone())
            .await?;

        if !response.is_success() {
            return Err(PlaybackError::SourceUnavailable {
                status: response.status,
                url,
            });
        }

        let asset = BookAsset::new(book, response.body);
        if let Some(limit) = self.config.max_book_bytes {
            if asset.size() > limit {
                return Err(PlaybackError::PayloadTooLarge {
                    book: book.to_string(),
                    bytes: asset.size(),
                    limit,
                });
            }
        }

        self.store.books.put(&asset).await?;
        Ok(asset)
    }

    /// Identifiers of every cached book.
    pub async fn get_book_keys(&self) -> Result<Vec<String>> {
        Ok(self.store.books.keys().await?)
    }

    pub async fn get_book(&self, book: &str) -> Result<Option<BookAsset>> {
        Ok(self.store.books.get(book).await?)
    }

    pub async fn is_cached(&self, book: &str) -> Result<bool> {
        Ok(self.store.books.contains(book).await?)
    }

    /// Delete a book's cached audio. Returns whether anything was removed.
    #[instrument(skip(self))]
    pub async fn remove_book(&self, book: &str) -> Result<bool> {
        let removed = self.store.books.delete(book).await?;
        if removed {
            info!("Book removed from cache");
            self.emit(CacheEvent::Removed {
                book: book.to_string(),
            });
        }
        Ok(removed)
    }

    pub fn is_downloading(&self, book: &str) -> bool {
        self.downloading.lock().contains(book)
    }

    /// Current cache state for the player's cache button.
    pub async fn cache_state(&self, book: &str) -> Result<CacheState> {
        if self.is_downloading(book) {
            return Ok(CacheState::Downloading);
        }
        Ok(if self.is_cached(book).await? {
            CacheState::Cached
        } else {
            CacheState::NotCached
        })
    }

    // ========================================================================
    // Covers
    // ========================================================================

    /// Fetch a book's cover. Only a successful response is stored; the
    /// fetched payload is returned either way.
    ///
    /// # Errors
    ///
    /// Fails on a network error or a store failure.
    #[instrument(skip(self))]
    pub async fn cache_cover(&self, book: &str) -> Result<CoverAsset> {
        let request =
            HttpRequest::get(self.endpoints.cover(book)).timeout(self.config.cover_timeout);
        let response = self.http.execute(request).await?;
        let cover = CoverAsset::new(book, response.body.clone());

        if response.is_success() {
            self.store.covers.put(&cover).await?;
            debug!(bytes = cover.data.len(), "Cover stored");
        } else {
            debug!(status = response.status, "Cover fetch failed, not stored");
        }
        Ok(cover)
    }

    pub async fn get_cover(&self, book: &str) -> Result<Option<CoverAsset>> {
        Ok(self.store.covers.get(book).await?)
    }

    /// Cover to show for a book being viewed.
    ///
    /// For a cached book the cover is refreshed first and the stored copy is
    /// returned. Uncached books return `None`; hosts then use the remote
    /// cover URL. Failures are logged, never returned.
    #[instrument(skip(self))]
    pub async fn cover_for_view(&self, book: &str) -> Option<CoverAsset> {
        match self.is_cached(book).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!(error = %e, "Cache lookup failed");
                return None;
            }
        }

        if self.config.refresh_covers {
            if let Err(e) = self.cache_cover(book).await {
                warn!(error = %e, "Cover refresh failed, using stored copy");
            }
        }

        match self.get_cover(book).await {
            Ok(cover) => cover,
            Err(e) => {
                warn!(error = %e, "Stored cover unavailable");
                None
            }
        }
    }

    // ========================================================================
    // Positions
    // ========================================================================

    /// Most recent locally stored position record for a book.
    pub async fn latest_position(&self, book: &str) -> Result<Option<PositionRecord>> {
        Ok(self.store.positions.latest_for_book(book).await?)
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(event_bus) = &self.event_bus {
            event_bus.emit(CoreEvent::Cache(event)).ok();
        }
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("downloading", &*self.downloading.lock())
            .finish()
    }
}

/// Marks a book as downloading until dropped.
struct DownloadGuard<'a> {
    active: &'a Mutex<HashSet<String>>,
    book: String,
}

impl<'a> DownloadGuard<'a> {
    fn acquire(active: &'a Mutex<HashSet<String>>, book: &str) -> Result<Self> {
        if !active.lock().insert(book.to_string()) {
            return Err(PlaybackError::DownloadInProgress(book.to_string()));
        }
        Ok(Self {
            active,
            book: book.to_string(),
        })
    }
}

impl Drop for DownloadGuard<'_> {
    fn drop(&mut self) {
        self.active.lock().remove(&self.book);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_guard_releases_on_drop() {
        let active = Mutex::new(HashSet::new());
        {
            let _guard = DownloadGuard::acquire(&active, "dune.m4b").unwrap();
            assert!(active.lock().contains("dune.m4b"));
            assert!(matches!(
                DownloadGuard::acquire(&active, "dune.m4b"),
                Err(PlaybackError::DownloadInProgress(_))
            ));
        }
        assert!(active.lock().is_empty());
    }
}

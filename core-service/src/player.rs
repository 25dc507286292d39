//! Player screen operations.
//!
//! [`PlayerSession`] owns the "which book is open" state and drives the open
//! book flow: reset the engine, load metadata, pick a source, pick a cover,
//! then let the reconciler resume at the last synced position.

use crate::error::{Result, ServiceError};
use bridge_traits::media::AudioSource;
use core_library::models::CoverAsset;
use core_library::LibraryService;
use core_playback::{CacheManager, CacheState, PlaybackEngine, TimeDisplay};
use core_runtime::config::ApiEndpoints;
use core_sync::PositionReconciler;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Cover shown on the player screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverImage {
    /// Locally cached image bytes.
    Stored(CoverAsset),
    /// Remote image the host loads itself.
    Remote(String),
}

#[derive(Default)]
struct SessionState {
    book: Option<String>,
    cover: Option<CoverImage>,
}

pub struct PlayerSession {
    engine: Arc<PlaybackEngine>,
    reconciler: Arc<PositionReconciler>,
    cache: Arc<CacheManager>,
    library: Arc<LibraryService>,
    endpoints: ApiEndpoints,
    display: Mutex<TimeDisplay>,
    state: Mutex<SessionState>,
}

impl PlayerSession {
    pub fn new(
        engine: Arc<PlaybackEngine>,
        reconciler: Arc<PositionReconciler>,
        cache: Arc<CacheManager>,
        library: Arc<LibraryService>,
        endpoints: ApiEndpoints,
    ) -> Self {
        Self {
            engine,
            reconciler,
            cache,
            library,
            endpoints,
            display: Mutex::new(TimeDisplay::default()),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn engine(&self) -> &Arc<PlaybackEngine> {
        &self.engine
    }

    pub fn book(&self) -> Option<String> {
        self.state.lock().book.clone()
    }

    pub fn cover(&self) -> Option<CoverImage> {
        self.state.lock().cover.clone()
    }

    fn active_book(&self) -> Result<String> {
        self.book().ok_or(ServiceError::NoActiveBook)
    }

    /// Make `book` the book on the player screen.
    ///
    /// Playback of the previous book stops. Missing metadata is tolerated:
    /// the book still plays, without chapters.
    ///
    /// # Errors
    ///
    /// Only local store failures.
    #[instrument(skip(self))]
    pub async fn open_book(&self, book: &str) -> Result<()> {
        self.engine.reset();
        self.reconciler.attach(&self.engine);
        *self.state.lock() = SessionState {
            book: Some(book.to_string()),
            cover: None,
        };

        match self.library.fetch_metadata(book).await {
            Ok(metadata) => self.engine.set_metadata(metadata),
            Err(e) => warn!(error = %e, "Opening book without metadata"),
        }

        let source = match self.cache.get_book(book).await? {
            Some(asset) => {
                debug!(bytes = asset.size(), "Playing cached copy");
                AudioSource::MemoryBuffer { data: asset.data }
            }
            None => AudioSource::RemoteStream {
                url: self.endpoints.book(book),
            },
        };
        self.engine.set_source(source);

        let cover_url = self.endpoints.cover(book);
        let cover = match self.cache.cover_for_view(book).await {
            Some(asset) => CoverImage::Stored(asset),
            None => CoverImage::Remote(cover_url.clone()),
        };
        self.engine.set_cover(cover_url);
        self.state.lock().cover = Some(cover);

        let resumed = self.reconciler.set_book(book).await?;
        info!(
            resumed_at = resumed.as_ref().map(|r| r.position),
            "Book opened"
        );
        Ok(())
    }

    /// Stop playback and forget the open book.
    pub fn close(&self) {
        self.engine.reset();
        self.reconciler.clear();
        *self.state.lock() = SessionState::default();
    }

    // ========================================================================
    // Time display
    // ========================================================================

    pub fn time_display(&self) -> TimeDisplay {
        *self.display.lock()
    }

    /// Switch between elapsed and remaining time. Returns the new mode.
    pub fn toggle_time_display(&self) -> TimeDisplay {
        let mut display = self.display.lock();
        *display = display.toggled();
        *display
    }

    /// Clock text for the current mode.
    pub fn time_text(&self) -> String {
        self.time_display()
            .render(self.engine.current_time(), self.engine.duration())
    }

    // ========================================================================
    // Cache button
    // ========================================================================

    pub async fn cache_state(&self) -> Result<CacheState> {
        let book = self.active_book()?;
        Ok(self.cache.cache_state(&book).await?)
    }

    /// Remove the open book from the cache, or cache it when missing.
    /// Does nothing while a download is running.
    ///
    /// # Returns
    /// The cache state afterwards.
    #[instrument(skip(self))]
    pub async fn cache_or_remove(&self) -> Result<CacheState> {
        let book = self.active_book()?;
        match self.cache.cache_state(&book).await? {
            CacheState::Cached => {
                self.cache.remove_book(&book).await?;
                Ok(CacheState::NotCached)
            }
            CacheState::NotCached => {
                self.cache.cache_book(&book).await?;
                Ok(CacheState::Cached)
            }
            CacheState::Downloading => {
                debug!("Download already running");
                Ok(CacheState::Downloading)
            }
        }
    }
}

impl std::fmt::Debug for PlayerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerSession")
            .field("book", &self.book())
            .field("display", &self.time_display())
            .finish()
    }
}

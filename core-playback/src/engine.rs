//! # Playback Engine
//!
//! Wraps the single host media handle. The engine owns the transient
//! playback state (metadata, chapters, cover) and turns transport commands
//! into seeks on the [`MediaElement`] plus [`PlaybackEvent`]s for its
//! listeners.
//!
//! Positions are always clamped to `[0, duration]`; out-of-range requests are
//! never errors.

use crate::chapters::{ChapterList, ChapterMark};
use crate::error::Result;
use crate::events::{PlaybackEvent, PlaybackEventKind, PlaybackListener};
use bridge_traits::media::{AudioSource, MediaAction, MediaElement, MediaSession, NowPlaying};
use core_library::models::Metadata;
use core_runtime::config::{ClientConfig, DEFAULT_JUMP_STEP, DEFAULT_SKIP_BACK_TOLERANCE};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Transport tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Seconds after a chapter boundary during which "previous" returns to
    /// that boundary.
    pub skip_back_tolerance: f64,
    /// Seconds moved by the seek-forward / seek-backward media actions.
    pub jump_step: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            skip_back_tolerance: DEFAULT_SKIP_BACK_TOLERANCE,
            jump_step: DEFAULT_JUMP_STEP,
        }
    }
}

impl From<&ClientConfig> for EngineConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            skip_back_tolerance: config.skip_back_tolerance,
            jump_step: config.jump_step,
        }
    }
}

/// Point-in-time view of the player for UI hosts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub current_time: f64,
    pub duration: Option<f64>,
    pub paused: bool,
    pub title: Option<String>,
    pub author: Option<String>,
    pub chapter: Option<ChapterMark>,
    pub cover: Option<String>,
}

#[derive(Default)]
struct EngineState {
    source: Option<AudioSource>,
    metadata: Option<Arc<Metadata>>,
    chapters: ChapterList,
    cover: Option<String>,
}

pub struct PlaybackEngine {
    media: Arc<dyn MediaElement>,
    session: Option<Arc<dyn MediaSession>>,
    config: EngineConfig,
    state: Mutex<EngineState>,
    listeners: Mutex<Vec<Arc<dyn PlaybackListener>>>,
}

impl PlaybackEngine {
    pub fn new(media: Arc<dyn MediaElement>, config: EngineConfig) -> Self {
        Self {
            media,
            session: None,
            config,
            state: Mutex::new(EngineState::default()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Mirror metadata and cover to the OS media session.
    pub fn with_media_session(mut self, session: Arc<dyn MediaSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Register a listener. Listeners are called in registration order and
    /// live until [`reset`](Self::reset).
    pub fn subscribe(&self, listener: Arc<dyn PlaybackListener>) {
        self.listeners.lock().push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn emit(&self, kind: PlaybackEventKind) {
        let event = PlaybackEvent::new(kind, self.current_time());
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_event(&event);
        }
    }

    // ========================================================================
    // Source, metadata, cover
    // ========================================================================

    pub fn set_source(&self, source: AudioSource) {
        debug!(remote = source.is_remote(), "Binding media source");
        self.media.load(&source);
        self.state.lock().source = Some(source);
    }

    pub fn source(&self) -> Option<AudioSource> {
        self.state.lock().source.clone()
    }

    pub fn set_metadata(&self, metadata: Arc<Metadata>) {
        {
            let mut state = self.state.lock();
            state.chapters = ChapterList::from_metadata(&metadata);
            state.metadata = Some(metadata);
        }
        self.publish_now_playing();
    }

    pub fn metadata(&self) -> Option<Arc<Metadata>> {
        self.state.lock().metadata.clone()
    }

    /// Artwork reference: a cover URL or a host object URL.
    pub fn set_cover(&self, cover: impl Into<String>) {
        self.state.lock().cover = Some(cover.into());
        self.publish_now_playing();
    }

    pub fn cover(&self) -> Option<String> {
        self.state.lock().cover.clone()
    }

    pub fn chapters(&self) -> ChapterList {
        self.state.lock().chapters.clone()
    }

    pub fn current_chapter(&self) -> Option<ChapterMark> {
        let now = self.current_time();
        self.state.lock().chapters.current(now).cloned()
    }

    pub fn title(&self) -> Option<String> {
        self.metadata_field(Metadata::title)
    }

    pub fn author(&self) -> Option<String> {
        self.metadata_field(Metadata::author)
    }

    pub fn series(&self) -> Option<String> {
        self.metadata_field(Metadata::series)
    }

    fn metadata_field(&self, field: fn(&Metadata) -> Option<&str>) -> Option<String> {
        let state = self.state.lock();
        state.metadata.as_deref().and_then(field).map(str::to_string)
    }

    fn publish_now_playing(&self) {
        let Some(session) = &self.session else {
            return;
        };
        let info = {
            let state = self.state.lock();
            let metadata = state.metadata.as_deref();
            NowPlaying {
                title: metadata.and_then(Metadata::title).map(str::to_string),
                artist: metadata.and_then(Metadata::author).map(str::to_string),
                album: metadata.and_then(Metadata::series).map(str::to_string),
                artwork: state.cover.clone(),
            }
        };
        session.set_now_playing(&info);
    }

    // ========================================================================
    // Clock
    // ========================================================================

    pub fn current_time(&self) -> f64 {
        let now = self.media.current_time();
        if now.is_finite() {
            now.max(0.0)
        } else {
            0.0
        }
    }

    /// Media duration once known, otherwise the metadata's format duration.
    pub fn duration(&self) -> Option<f64> {
        self.media
            .duration()
            .filter(|d| d.is_finite() && *d > 0.0)
            .or_else(|| {
                self.state
                    .lock()
                    .metadata
                    .as_deref()
                    .and_then(Metadata::duration_seconds)
            })
    }

    pub fn is_paused(&self) -> bool {
        self.media.is_paused()
    }

    fn clamp(&self, seconds: f64) -> f64 {
        let lower = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        match self.duration() {
            Some(duration) => lower.min(duration),
            None => lower,
        }
    }

    /// Forward the host's media clock tick.
    pub fn time_update(&self) {
        self.emit(PlaybackEventKind::TimeUpdate);
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// # Errors
    ///
    /// Returns the host's refusal to start playback; no event is emitted then.
    pub fn play(&self) -> Result<()> {
        self.media.play()?;
        self.emit(PlaybackEventKind::Play);
        Ok(())
    }

    pub fn pause(&self) {
        self.media.pause();
        self.emit(PlaybackEventKind::Pause);
    }

    pub fn toggle_play(&self) -> Result<()> {
        if self.is_paused() {
            self.play()
        } else {
            self.pause();
            Ok(())
        }
    }

    pub fn set_position(&self, seconds: f64) {
        self.media.seek(self.clamp(seconds));
        self.emit(PlaybackEventKind::SetPosition);
    }

    pub fn jump(&self, delta_seconds: f64) {
        let target = self.current_time() + delta_seconds;
        self.media.seek(self.clamp(target));
        self.emit(PlaybackEventKind::Jump);
    }

    /// Seek to the next chapter start, or to the end without one.
    pub fn skip_next(&self) {
        let now = self.current_time();
        let next = self.state.lock().chapters.next_start(now);
        if let Some(target) = next.or_else(|| self.duration()) {
            self.media.seek(self.clamp(target));
        }
        self.emit(PlaybackEventKind::SkipNext);
    }

    /// Seek back to the current chapter's start, or to the start of the book
    /// without chapters.
    pub fn skip_previous(&self) {
        let now = self.current_time();
        let target = self
            .state
            .lock()
            .chapters
            .previous_target(now, self.config.skip_back_tolerance)
            .unwrap_or(0.0);
        self.media.seek(self.clamp(target));
        self.emit(PlaybackEventKind::SkipPrevious);
    }

    /// Resume point applied when a book opens. Emits nothing.
    pub fn set_startup_position(&self, seconds: f64) {
        let target = self.clamp(seconds);
        debug!(position = target, "Seeking to startup position");
        self.media.seek(target);
    }

    /// Route an OS media-session action to the matching transport command.
    pub fn handle_media_action(&self, action: MediaAction) -> Result<()> {
        debug!(?action, "Media session action");
        match action {
            MediaAction::Pause => self.toggle_play()?,
            MediaAction::SeekTo(seconds) => self.set_position(seconds),
            MediaAction::SeekForward => self.jump(self.config.jump_step),
            MediaAction::SeekBackward => self.jump(-self.config.jump_step),
            MediaAction::NextTrack => self.skip_next(),
            MediaAction::PreviousTrack => self.skip_previous(),
        }
        Ok(())
    }

    /// Stop playback, release the source and forget the book.
    pub fn reset(&self) {
        self.media.detach();
        *self.state.lock() = EngineState::default();
        let dropped = std::mem::take(&mut *self.listeners.lock()).len();
        if let Some(session) = &self.session {
            session.clear();
        }
        debug!(listeners = dropped, "Playback engine reset");
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let current_time = self.current_time();
        let duration = self.duration();
        let paused = self.is_paused();
        let state = self.state.lock();
        let metadata = state.metadata.as_deref();
        PlaybackSnapshot {
            current_time,
            duration,
            paused,
            title: metadata.and_then(Metadata::title).map(str::to_string),
            author: metadata.and_then(Metadata::author).map(str::to_string),
            chapter: state.chapters.current(current_time).cloned(),
            cover: state.cover.clone(),
        }
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("config", &self.config)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

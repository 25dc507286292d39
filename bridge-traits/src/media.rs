//! Media bridge traits.
//!
//! The core never decodes audio. It drives a single host media handle (an
//! `HTMLAudioElement`, an `AVPlayer`, a desktop audio sink) through
//! [`MediaElement`] and mirrors "now playing" information to the operating
//! system through [`MediaSession`]. Both traits are synchronous: the
//! underlying primitives expose their state as plain properties and report
//! progress through host callbacks.

use crate::{error::Result, platform::PlatformSendSync};
use bytes::Bytes;

/// Byte source bound to the media handle.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    /// Remote HTTP(S) stream fetched by the host.
    RemoteStream { url: String },
    /// In-memory audio buffer, typically a locally cached book.
    MemoryBuffer { data: Bytes },
}

impl AudioSource {
    /// Determine whether the source represents remote content.
    pub fn is_remote(&self) -> bool {
        matches!(self, AudioSource::RemoteStream { .. })
    }
}

/// Single platform media-playback handle.
pub trait MediaElement: PlatformSendSync {
    /// Bind the handle to a new source. Playback position resets to zero.
    fn load(&self, source: &AudioSource);

    /// Start or resume playback.
    ///
    /// # Errors
    ///
    /// Hosts may refuse playback (autoplay policy, missing source).
    fn play(&self) -> Result<()>;

    fn pause(&self);

    /// Seek to an absolute position in seconds.
    fn seek(&self, seconds: f64);

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Total duration in seconds, `None` until the source is loaded.
    fn duration(&self) -> Option<f64>;

    fn is_paused(&self) -> bool;

    /// Stop playback and release the bound source.
    fn detach(&self);
}

/// "Now playing" information surfaced to the operating system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NowPlaying {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Artwork URL or object URL of a cached cover.
    pub artwork: Option<String>,
}

/// Transport actions the operating system may route back to the player
/// (lock screen, media keys, headset buttons).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaAction {
    Pause,
    SeekTo(f64),
    SeekForward,
    SeekBackward,
    NextTrack,
    PreviousTrack,
}

/// OS-level media session surface.
pub trait MediaSession: PlatformSendSync {
    fn set_now_playing(&self, info: &NowPlaying);

    /// Remove any "now playing" entry.
    fn clear(&self) {
        self.set_now_playing(&NowPlaying::default());
    }
}

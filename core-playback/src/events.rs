//! Playback lifecycle events
//!
//! The engine delivers every event synchronously, in emission order, to each
//! registered [`PlaybackListener`].

use bridge_traits::platform::PlatformSendSync;
use serde::{Deserialize, Serialize};

/// Kind of playback transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackEventKind {
    Play,
    Pause,
    TimeUpdate,
    Jump,
    SetPosition,
    SkipNext,
    SkipPrevious,
}

impl PlaybackEventKind {
    /// Events produced by uninterrupted playback.
    pub fn is_continuous(self) -> bool {
        matches!(self, PlaybackEventKind::Play | PlaybackEventKind::TimeUpdate)
    }

    /// Discontinuities in position: scrubs, jumps and chapter skips.
    pub fn is_seek(self) -> bool {
        matches!(
            self,
            PlaybackEventKind::Jump
                | PlaybackEventKind::SetPosition
                | PlaybackEventKind::SkipNext
                | PlaybackEventKind::SkipPrevious
        )
    }
}

/// Event emitted by the playback engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackEvent {
    pub kind: PlaybackEventKind,
    /// Media position in seconds after the transition.
    pub current_time: f64,
}

impl PlaybackEvent {
    pub fn new(kind: PlaybackEventKind, current_time: f64) -> Self {
        Self { kind, current_time }
    }
}

/// Receiver of playback events.
///
/// Called outside the engine's internal locks, so implementations may call
/// back into the engine.
pub trait PlaybackListener: PlatformSendSync {
    fn on_event(&self, event: &PlaybackEvent);
}

impl<F> PlaybackListener for F
where
    F: Fn(&PlaybackEvent) + PlatformSendSync,
{
    fn on_event(&self, event: &PlaybackEvent) {
        self(event)
    }
}

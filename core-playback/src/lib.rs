//! # Playback & Book Cache Module
//!
//! Drives the host media handle and keeps books available offline.
//!
//! ## Overview
//!
//! This module handles:
//! - Transport control over a host [`MediaElement`](bridge_traits::media::MediaElement)
//!   with chapter-aware skipping (`engine`, `chapters`)
//! - Playback lifecycle events for position tracking (`events`)
//! - Clock formatting for the player screen (`display`)
//! - Whole-book and cover caching in the local store (`cache`)

pub mod cache;
pub mod chapters;
pub mod display;
pub mod engine;
pub mod error;
pub mod events;

pub use cache::{CacheConfig, CacheManager, CacheState};
pub use chapters::{ChapterList, ChapterMark};
pub use display::{format_timestamp, TimeDisplay};
pub use engine::{EngineConfig, PlaybackEngine, PlaybackSnapshot};
pub use error::{PlaybackError, Result};
pub use events::{PlaybackEvent, PlaybackEventKind, PlaybackListener};

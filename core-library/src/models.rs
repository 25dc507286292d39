//! Domain models for the local store and the remote book server
//!
//! Asset and position types are persisted locally. Metadata mirrors the
//! `ffprobe` JSON the server returns and is never persisted.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Cached assets
// =============================================================================

/// Whole-book audio payload cached for offline playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookAsset {
    /// Book identifier (file name on the server).
    pub filename: String,
    pub data: Bytes,
}

impl BookAsset {
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Cover image cached alongside a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverAsset {
    pub book: String,
    pub data: Bytes,
}

impl CoverAsset {
    pub fn new(book: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            book: book.into(),
            data: data.into(),
        }
    }
}

// =============================================================================
// Playback positions
// =============================================================================

/// One listening session for a book.
///
/// Serialized in the server's wire format: the sync identifier travels as
/// `id`, the local row identifier never leaves the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Row identifier in the local store.
    #[serde(skip)]
    pub local_id: Option<i64>,

    /// Identifier assigned by the server.
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<i64>,

    pub book: String,

    /// Seconds from the start of the book.
    pub position: f64,

    /// Milliseconds since the Unix epoch of the last update.
    pub timestamp: i64,

    /// Session identifier assigned by the client that created the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl PositionRecord {
    /// New unsynced record with a fresh client session identifier.
    pub fn new(book: impl Into<String>, position: f64, timestamp: i64) -> Self {
        Self {
            local_id: None,
            sync_id: None,
            book: book.into(),
            position: position.max(0.0),
            timestamp,
            client_id: Some(Uuid::new_v4().to_string()),
        }
    }

    /// Give the record a fresh session identifier if it has none.
    ///
    /// Records created by clients that do not tag sessions arrive without
    /// one; a record must carry one before it can be tracked as current.
    pub fn ensure_session(&mut self) -> &str {
        self.client_id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .as_str()
    }

    /// Whether both records carry the same client session identifier.
    pub fn same_session(&self, other: &PositionRecord) -> bool {
        matches!((&self.client_id, &other.client_id), (Some(a), Some(b)) if a == b)
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// Free-form tags attached to a format or chapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub composer: Option<String>,
    pub date: Option<String>,
    pub encoder: Option<String>,
    pub comment: Option<String>,
    pub genre: Option<String>,
    pub copyright: Option<String>,
    pub description: Option<String>,
    pub compilation: Option<String>,
    pub track: Option<String>,
    pub major_brand: Option<String>,
    pub minor_version: Option<String>,
    pub compatible_brands: Option<String>,
    pub creation_time: Option<String>,
}

/// Chapter marker. `start`/`end` are in `time_base` units, the `*_time`
/// fields are decimal seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Chapter {
    pub id: i64,
    pub time_base: String,
    pub start: i64,
    pub start_time: String,
    pub end: i64,
    pub end_time: String,
    pub tags: Tags,
}

impl Chapter {
    pub fn start_seconds(&self) -> f64 {
        parse_seconds(&self.start_time).unwrap_or(0.0)
    }

    pub fn end_seconds(&self) -> f64 {
        parse_seconds(&self.end_time).unwrap_or(0.0)
    }

    pub fn title(&self) -> Option<&str> {
        self.tags.title.as_deref()
    }

    /// Whether `seconds` falls in `[start, end)`.
    pub fn contains(&self, seconds: f64) -> bool {
        self.start_seconds() <= seconds && seconds < self.end_seconds()
    }
}

/// Container-level probe information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Format {
    pub filename: Option<String>,
    pub nb_streams: Option<u32>,
    pub nb_programs: Option<u32>,
    pub format_name: Option<String>,
    pub format_long_name: Option<String>,
    pub start_time: Option<String>,
    pub duration: Option<String>,
    pub size: Option<String>,
    pub bit_rate: Option<String>,
    pub probe_score: Option<i32>,
    pub tags: Tags,
}

/// Chapter list and format information for one book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub chapters: Vec<Chapter>,
    pub format: Format,
}

impl Metadata {
    pub fn duration_seconds(&self) -> Option<f64> {
        self.format.duration.as_deref().and_then(parse_seconds)
    }

    pub fn title(&self) -> Option<&str> {
        self.format.tags.title.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.format.tags.artist.as_deref()
    }

    pub fn series(&self) -> Option<&str> {
        self.format.tags.album.as_deref()
    }
}

fn parse_seconds(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|s| s.is_finite())
}

//! Chapter navigation
//!
//! Chapter boundaries are taken from the metadata's decimal `start_time` /
//! `end_time` strings and kept in presentation order.

use core_library::models::Metadata;
use serde::Serialize;

/// One chapter boundary pair, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterMark {
    pub index: usize,
    pub title: Option<String>,
    pub start: f64,
    pub end: f64,
}

impl ChapterMark {
    pub fn contains(&self, seconds: f64) -> bool {
        self.start <= seconds && seconds < self.end
    }
}

/// Ordered chapter list for the active book.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterList {
    marks: Vec<ChapterMark>,
}

impl ChapterList {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let mut marks: Vec<ChapterMark> = metadata
            .chapters
            .iter()
            .map(|chapter| ChapterMark {
                index: 0,
                title: chapter.title().map(str::to_string),
                start: chapter.start_seconds(),
                end: chapter.end_seconds(),
            })
            .collect();
        marks.sort_by(|a, b| a.start.total_cmp(&b.start));
        for (index, mark) in marks.iter_mut().enumerate() {
            mark.index = index;
        }
        Self { marks }
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChapterMark> {
        self.marks.iter()
    }

    /// Chapter with `start <= seconds < end`.
    pub fn current(&self, seconds: f64) -> Option<&ChapterMark> {
        self.marks.iter().find(|mark| mark.contains(seconds))
    }

    /// Start of the first chapter beginning after `seconds`.
    pub fn next_start(&self, seconds: f64) -> Option<f64> {
        self.marks
            .iter()
            .find(|mark| mark.start > seconds)
            .map(|mark| mark.start)
    }

    /// Back-skip target for position `seconds`.
    ///
    /// Within `tolerance` seconds after a boundary the target is that
    /// boundary; otherwise it is the start of the chapter being played.
    /// Past the last chapter's end the last chapter's start is used.
    pub fn previous_target(&self, seconds: f64, tolerance: f64) -> Option<f64> {
        let threshold = seconds - tolerance;
        match self.marks.iter().find(|mark| mark.end > threshold) {
            Some(mark) if mark.end <= seconds => Some(mark.end),
            Some(mark) => Some(mark.start),
            None => self
                .marks
                .iter()
                .rev()
                .find(|mark| mark.start <= seconds)
                .map(|mark| mark.start),
        }
    }
}

//! Position tracking state machine
//!
//! [`PositionTracker`] holds the in-progress record and the finalized history
//! for one book and decides, per playback event, whether the current record
//! is extended in place or split off into history. It performs no I/O: every
//! decision that needs a store write and a remote push is returned to the
//! caller as the record to synchronize.
//!
//! ## State Transitions
//!
//! ```text
//! EXTENDING --seek/jump/skip--> PENDING_SPLIT
//! PENDING_SPLIT --play/tick, < delay--> EXTENDING (no split)
//! PENDING_SPLIT --play/tick, >= delay--> EXTENDING (split)
//! PENDING_SPLIT --seek, >= delay--> PENDING_SPLIT (split)
//! any --pause--> EXTENDING (split at pause time)
//! ```

use core_library::models::PositionRecord;
use core_playback::events::{PlaybackEvent, PlaybackEventKind};
use core_runtime::config::{ClientConfig, DEFAULT_NEW_POSITION_DELAY, DEFAULT_SYNC_INTERVAL};
use serde::Serialize;

/// Timing thresholds, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Gap after a seek at or beyond which a new record is started.
    pub new_position_delay_ms: i64,
    /// Minimum time between opportunistic pushes while extending.
    pub sync_interval_ms: i64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            new_position_delay_ms: DEFAULT_NEW_POSITION_DELAY.as_millis() as i64,
            sync_interval_ms: DEFAULT_SYNC_INTERVAL.as_millis() as i64,
        }
    }
}

impl From<&ClientConfig> for TrackerConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            new_position_delay_ms: config.new_position_delay.as_millis() as i64,
            sync_interval_ms: config.sync_interval.as_millis() as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingMode {
    /// Events update the current record in place.
    Extending,
    /// A discontinuity was observed at `since_ms`.
    PendingSplit { since_ms: i64 },
}

#[derive(Debug, Clone)]
pub struct PositionTracker {
    config: TrackerConfig,
    current: PositionRecord,
    history: Vec<PositionRecord>,
    mode: TrackingMode,
    last_sync_ms: i64,
}

impl PositionTracker {
    /// Fresh state for `book`: a zeroed current record with a new session
    /// identifier, no history, no previous push.
    pub fn new(book: impl Into<String>, now_ms: i64, config: TrackerConfig) -> Self {
        Self {
            config,
            current: PositionRecord::new(book, 0.0, now_ms),
            history: Vec::new(),
            mode: TrackingMode::Extending,
            last_sync_ms: 0,
        }
    }

    pub fn book(&self) -> &str {
        &self.current.book
    }

    pub fn current(&self) -> &PositionRecord {
        &self.current
    }

    /// Finalized records, oldest first.
    pub fn history(&self) -> &[PositionRecord] {
        &self.history
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    pub fn last_sync_ms(&self) -> i64 {
        self.last_sync_ms
    }

    /// Apply one playback event observed at `now_ms`.
    ///
    /// Returns the record to persist and push, if this event calls for a
    /// synchronization.
    pub fn observe(&mut self, event: &PlaybackEvent, now_ms: i64) -> Option<PositionRecord> {
        let time = event.current_time;

        match event.kind {
            PlaybackEventKind::Pause => {
                self.extend(time, now_ms);
                Some(self.split(time, now_ms))
            }
            kind if !kind.is_continuous() => {
                let finalized = match self.mode {
                    TrackingMode::PendingSplit { since_ms } if self.delay_elapsed(since_ms, now_ms) => {
                        Some(self.split(time, now_ms))
                    }
                    _ => None,
                };
                self.mode = TrackingMode::PendingSplit { since_ms: now_ms };
                finalized
            }
            _ => {
                if let TrackingMode::PendingSplit { since_ms } = self.mode {
                    self.mode = TrackingMode::Extending;
                    if self.delay_elapsed(since_ms, now_ms) {
                        return Some(self.split(time, now_ms));
                    }
                }
                self.extend(time, now_ms);
                if now_ms - self.last_sync_ms > self.config.sync_interval_ms {
                    self.last_sync_ms = now_ms;
                    return Some(self.current.clone());
                }
                None
            }
        }
    }

    fn delay_elapsed(&self, since_ms: i64, now_ms: i64) -> bool {
        now_ms - since_ms >= self.config.new_position_delay_ms
    }

    fn extend(&mut self, position: f64, now_ms: i64) {
        self.current.position = position.max(0.0);
        self.current.timestamp = now_ms;
    }

    /// Move the current record into history and start a new one at
    /// `seed_position`. Returns the finalized record.
    fn split(&mut self, seed_position: f64, now_ms: i64) -> PositionRecord {
        let fresh = PositionRecord::new(self.current.book.clone(), seed_position, now_ms);
        let finalized = std::mem::replace(&mut self.current, fresh);
        self.history.push(finalized.clone());
        self.mode = TrackingMode::Extending;
        self.last_sync_ms = now_ms;
        finalized
    }

    pub fn mark_synced(&mut self, now_ms: i64) {
        self.last_sync_ms = now_ms;
    }

    fn find_session_mut(&mut self, client_id: &str) -> Option<&mut PositionRecord> {
        std::iter::once(&mut self.current)
            .chain(self.history.iter_mut())
            .find(|r| r.client_id.as_deref() == Some(client_id))
    }

    /// Store identifiers known in memory for a session.
    pub fn ids_for(&self, client_id: &str) -> Option<(Option<i64>, Option<i64>)> {
        std::iter::once(&self.current)
            .chain(self.history.iter())
            .find(|r| r.client_id.as_deref() == Some(client_id))
            .map(|r| (r.local_id, r.sync_id))
    }

    /// Record the local row identifier assigned to a session's record.
    pub fn write_back_local_id(&mut self, client_id: &str, local_id: i64) {
        if let Some(record) = self.find_session_mut(client_id) {
            record.local_id = Some(local_id);
        }
    }

    /// Fold the stored canonical set into memory.
    ///
    /// The counterpart of the current record is the canonical record sharing
    /// its session identifier, else the one carrying its server identifier.
    /// When neither matches and the current record was the one pushed
    /// (`pushed_client_id`), the most recent canonical record is taken. The
    /// counterpart lends its identifiers to the current record; position and
    /// timestamp stay as tracked locally. Every other canonical record
    /// becomes history, together with finalized records that were never
    /// stored.
    pub fn merge(&mut self, canonical: &[PositionRecord], pushed_client_id: Option<&str>) {
        let current = &self.current;
        let pushed_current =
            pushed_client_id.is_some() && pushed_client_id == current.client_id.as_deref();
        let counterpart = canonical
            .iter()
            .position(|r| r.same_session(current))
            .or_else(|| {
                current
                    .sync_id
                    .and_then(|id| canonical.iter().position(|r| r.sync_id == Some(id)))
            })
            .or_else(|| {
                if pushed_current {
                    canonical
                        .iter()
                        .enumerate()
                        .max_by_key(|(_, r)| r.timestamp)
                        .map(|(i, _)| i)
                } else {
                    None
                }
            });

        if let Some(index) = counterpart {
            let matched = &canonical[index];
            self.current.sync_id = matched.sync_id.or(self.current.sync_id);
            self.current.local_id = matched.local_id;
        }

        let unstored: Vec<PositionRecord> = self
            .history
            .drain(..)
            .filter(|r| r.local_id.is_none())
            .filter(|r| !canonical.iter().any(|c| c.same_session(r)))
            .collect();

        self.history = canonical
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != counterpart)
            .map(|(_, r)| r.clone())
            .chain(unstored)
            .collect();
        self.history.sort_by_key(|r| r.timestamp);
    }

    /// Use the locally stored records as history when no canonical set is
    /// available.
    pub fn hydrate(&mut self, local: &[PositionRecord]) {
        let current = &self.current;
        self.history = local
            .iter()
            .filter(|r| !r.same_session(current))
            .cloned()
            .collect();
        self.history.sort_by_key(|r| r.timestamp);
    }

    /// Promote the most recent history record to current when the current
    /// record has no server identity yet.
    pub fn adopt_latest(&mut self) -> Option<PositionRecord> {
        if self.current.sync_id.is_some() || self.history.is_empty() {
            return None;
        }
        self.history.sort_by_key(|r| r.timestamp);
        let mut adopted = self.history.pop()?;
        adopted.ensure_session();
        self.current = adopted.clone();
        Some(adopted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK: &str = "A";

    fn tracker() -> PositionTracker {
        PositionTracker::new(BOOK, 0, TrackerConfig::default())
    }

    fn event(kind: PlaybackEventKind, time: f64) -> PlaybackEvent {
        PlaybackEvent::new(kind, time)
    }

    #[test]
    fn test_pause_after_continuous_playback() {
        let mut t = tracker();
        t.mark_synced(0);
        t.observe(&event(PlaybackEventKind::Play, 0.0), 0);
        let mut pushes = 0;
        for second in 1..=1800 {
            let now = second * 1000;
            if t.observe(&event(PlaybackEventKind::TimeUpdate, second as f64), now).is_some() {
                pushes += 1;
            }
        }
        assert!(t.history().is_empty());
        assert!(pushes > 0);

        let finalized = t.observe(&event(PlaybackEventKind::Pause, 1800.0), 1_800_500);
        let finalized = finalized.unwrap();
        assert_eq!(finalized.position, 1800.0);
        assert_eq!(finalized.book, BOOK);
        assert_eq!(t.history().len(), 1);
        assert_eq!(t.history()[0].position, 1800.0);
        assert_eq!(t.current().position, 1800.0);
        assert!(!t.current().same_session(&finalized));
    }

    #[test]
    fn test_quick_skips_do_not_split() {
        let mut t = tracker();
        t.mark_synced(0);
        t.observe(&event(PlaybackEventKind::Play, 0.0), 0);
        assert!(t.observe(&event(PlaybackEventKind::SkipNext, 600.0), 1_000).is_none());
        assert!(t.observe(&event(PlaybackEventKind::SkipNext, 1200.0), 3_000).is_none());
        assert_eq!(t.mode(), TrackingMode::PendingSplit { since_ms: 3_000 });

        for tick in 1..=40 {
            let now = 3_000 + tick * 250;
            t.observe(
                &event(PlaybackEventKind::TimeUpdate, 1200.0 + tick as f64 * 0.25),
                now,
            );
        }
        assert!(t.history().is_empty());
        assert_eq!(t.mode(), TrackingMode::Extending);
        assert!((t.current().position - 1210.0).abs() < 0.01);
    }

    #[test]
    fn test_seek_does_not_update_current_record() {
        let mut t = tracker();
        t.observe(&event(PlaybackEventKind::TimeUpdate, 50.0), 500);
        t.observe(&event(PlaybackEventKind::SetPosition, 900.0), 1_000);
        assert_eq!(t.current().position, 50.0);
    }

    #[test]
    fn test_split_after_delay_is_inclusive() {
        let mut t = tracker();
        t.mark_synced(0);
        t.observe(&event(PlaybackEventKind::TimeUpdate, 100.0), 1_000);
        t.observe(&event(PlaybackEventKind::Jump, 130.0), 2_000);
        let finalized = t
            .observe(&event(PlaybackEventKind::TimeUpdate, 130.0), 7_000)
            .unwrap();
        assert_eq!(finalized.position, 100.0);
        assert_eq!(t.current().position, 130.0);
        assert_eq!(t.history().len(), 1);
        assert_eq!(t.mode(), TrackingMode::Extending);
    }

    #[test]
    fn test_one_split_per_long_gap_between_seeks() {
        let mut t = tracker();
        t.observe(&event(PlaybackEventKind::Jump, 30.0), 0);
        assert!(t.observe(&event(PlaybackEventKind::Jump, 60.0), 5_000).is_some());
        assert!(t.observe(&event(PlaybackEventKind::Jump, 90.0), 6_000).is_none());
        assert!(t.observe(&event(PlaybackEventKind::Jump, 120.0), 20_000).is_some());
        assert_eq!(t.history().len(), 2);
        assert_eq!(t.current().position, 120.0);
    }

    #[test]
    fn test_opportunistic_sync_interval() {
        let mut t = tracker();
        t.mark_synced(0);
        assert!(t.observe(&event(PlaybackEventKind::TimeUpdate, 1.0), 10_000).is_none());
        let pushed = t.observe(&event(PlaybackEventKind::TimeUpdate, 2.0), 10_001);
        assert_eq!(pushed.map(|r| r.position), Some(2.0));
        assert!(t.observe(&event(PlaybackEventKind::TimeUpdate, 3.0), 15_000).is_none());
        assert_eq!(t.last_sync_ms(), 10_001);
    }

    #[test]
    fn test_first_event_after_reset_syncs() {
        let mut t = tracker();
        assert!(t.observe(&event(PlaybackEventKind::Play, 0.0), 20_000).is_some());
    }

    #[test]
    fn test_merge_matches_by_session() {
        let mut t = tracker();
        let session = t.current().client_id.clone();
        let mut mine = t.current().clone();
        mine.sync_id = Some(9);
        mine.local_id = Some(4);
        mine.position = 1.0;
        let other = PositionRecord {
            sync_id: Some(8),
            local_id: Some(3),
            ..PositionRecord::new(BOOK, 500.0, 10)
        };
        t.observe(&event(PlaybackEventKind::TimeUpdate, 42.0), 20);

        t.merge(&[other.clone(), mine], session.as_deref());
        assert_eq!(t.current().sync_id, Some(9));
        assert_eq!(t.current().local_id, Some(4));
        assert_eq!(t.current().position, 42.0);
        assert_eq!(t.history(), &[other]);
    }

    #[test]
    fn test_merge_falls_back_to_latest_for_pushed_current() {
        let mut t = tracker();
        let session = t.current().client_id.clone();
        let older = PositionRecord {
            sync_id: Some(1),
            client_id: None,
            ..PositionRecord::new(BOOK, 10.0, 100)
        };
        let newer = PositionRecord {
            sync_id: Some(2),
            client_id: None,
            ..PositionRecord::new(BOOK, 20.0, 200)
        };

        t.merge(&[older.clone(), newer], session.as_deref());
        assert_eq!(t.current().sync_id, Some(2));
        assert_eq!(t.current().client_id, session);
        assert_eq!(t.history(), &[older]);
    }

    #[test]
    fn test_merge_without_push_keeps_current_unsynced() {
        let mut t = tracker();
        let remote = PositionRecord {
            sync_id: Some(1),
            ..PositionRecord::new(BOOK, 10.0, 100)
        };
        t.merge(&[remote.clone()], None);
        assert_eq!(t.current().sync_id, None);
        assert_eq!(t.history(), &[remote]);
    }

    #[test]
    fn test_merge_keeps_unstored_finalized_records() {
        let mut t = tracker();
        t.observe(&event(PlaybackEventKind::Pause, 75.0), 1_000);
        let pending = t.history()[0].clone();
        assert!(pending.local_id.is_none());

        let remote = PositionRecord {
            sync_id: Some(1),
            local_id: Some(1),
            ..PositionRecord::new(BOOK, 10.0, 100)
        };
        t.merge(&[remote.clone()], None);
        assert_eq!(t.history(), &[remote, pending]);
    }

    #[test]
    fn test_hydrate_and_adopt_latest() {
        let mut t = tracker();
        let local = vec![
            PositionRecord::new(BOOK, 300.0, 3_000),
            PositionRecord::new(BOOK, 100.0, 1_000),
        ];
        t.hydrate(&local);
        let adopted = t.adopt_latest().unwrap();
        assert_eq!(adopted.position, 300.0);
        assert_eq!(t.current(), &adopted);
        assert_eq!(t.history().len(), 1);
    }

    #[test]
    fn test_no_adoption_once_current_has_server_identity() {
        let mut t = tracker();
        let session = t.current().client_id.clone();
        let mine = PositionRecord {
            sync_id: Some(5),
            client_id: session.clone(),
            ..PositionRecord::new(BOOK, 0.0, 0)
        };
        let other = PositionRecord::new(BOOK, 900.0, 9_000);
        t.merge(&[mine, other], session.as_deref());
        assert!(t.adopt_latest().is_none());
    }

    #[test]
    fn test_adopted_untagged_record_gets_session() {
        let mut t = tracker();
        let untagged = PositionRecord {
            local_id: Some(1),
            sync_id: Some(1),
            client_id: None,
            ..PositionRecord::new(BOOK, 300.0, 3_000)
        };
        t.merge(&[untagged], None);

        let adopted = t.adopt_latest().unwrap();
        assert!(adopted.client_id.is_some());
        assert_eq!(adopted.sync_id, Some(1));
        assert!(t.history().is_empty());
    }

    #[test]
    fn test_merge_matches_untagged_counterpart_by_sync_id() {
        let mut t = tracker();
        let resumed = PositionRecord {
            local_id: Some(1),
            sync_id: Some(1),
            client_id: None,
            ..PositionRecord::new(BOOK, 300.0, 3_000)
        };
        t.hydrate(&[resumed.clone()]);
        t.adopt_latest().unwrap();
        t.observe(&event(PlaybackEventKind::TimeUpdate, 321.0), 21_000);

        let stored_resumed = PositionRecord {
            local_id: Some(7),
            position: 321.0,
            timestamp: 21_000,
            ..resumed
        };
        let other_device = PositionRecord {
            local_id: Some(8),
            sync_id: Some(2),
            client_id: None,
            ..PositionRecord::new(BOOK, 10.0, 30_000)
        };
        t.merge(&[stored_resumed, other_device.clone()], None);

        assert_eq!(t.current().sync_id, Some(1));
        assert_eq!(t.current().local_id, Some(7));
        assert_eq!(t.current().position, 321.0);
        assert_eq!(t.history(), &[other_device]);
    }

    #[test]
    fn test_write_back_local_id() {
        let mut t = tracker();
        let session = t.current().client_id.clone().unwrap();
        t.write_back_local_id(&session, 17);
        assert_eq!(t.ids_for(&session), Some((Some(17), None)));
        assert_eq!(t.ids_for("unknown"), None);
    }
}

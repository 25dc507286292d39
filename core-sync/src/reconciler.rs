//! # Position Reconciler
//!
//! Listens to the playback engine, keeps the [`PositionTracker`] for the
//! active book and synchronizes its records with the local store and the
//! remote position service.
//!
//! ## Sync pipeline
//!
//! 1. Persist the snapshot record (upsert) and write the assigned local id
//!    back onto the matching in-memory record
//! 2. Read the book's local record set
//! 3. Push it to the remote
//! 4. Replace the book's local records with the canonical set
//! 5. Merge the canonical set into memory
//!
//! Pipelines are serialized by an async gate. Remote failures leave the local
//! record set untouched and are retried on the next trigger; only local store
//! failures are returned as errors.

use crate::error::{Result, SyncError};
use crate::remote::PositionRemote;
use crate::tracker::{PositionTracker, TrackerConfig, TrackingMode};
use bridge_traits::background::TaskSpawner;
use bridge_traits::time::Clock;
use core_library::models::PositionRecord;
use core_library::repositories::PositionRepository;
use core_playback::engine::PlaybackEngine;
use core_playback::events::{PlaybackEvent, PlaybackListener};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument, warn};

/// Result of one pass through the sync pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The canonical set replaced the book's local records.
    Merged(Vec<PositionRecord>),
    /// The remote had nothing to report; local records are unchanged.
    NoUpdate(Vec<PositionRecord>),
    /// The remote could not be reached or answered with an error; local
    /// records are unchanged.
    Offline(Vec<PositionRecord>),
}

impl SyncOutcome {
    /// The book's record set after the pipeline.
    pub fn records(&self) -> &[PositionRecord] {
        match self {
            SyncOutcome::Merged(records)
            | SyncOutcome::NoUpdate(records)
            | SyncOutcome::Offline(records) => records,
        }
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, SyncOutcome::Merged(_))
    }
}

pub struct PositionReconciler {
    this: Weak<PositionReconciler>,
    positions: Arc<dyn PositionRepository>,
    remote: Arc<dyn PositionRemote>,
    clock: Arc<dyn Clock>,
    spawner: Arc<dyn TaskSpawner>,
    config: TrackerConfig,
    event_bus: Option<EventBus>,
    tracker: Mutex<Option<PositionTracker>>,
    engine: Mutex<Weak<PlaybackEngine>>,
    sync_gate: tokio::sync::Mutex<()>,
}

impl PositionReconciler {
    /// Create a reconciler with no active book.
    ///
    /// # Arguments
    ///
    /// * `positions` - Local position store
    /// * `remote` - Authoritative remote position store
    /// * `clock` - Time source for record timestamps and split decisions
    /// * `spawner` - Runs sync pipelines triggered by playback events
    /// * `config` - Split and sync thresholds
    /// * `event_bus` - Optional bus for sync notifications
    pub fn new(
        positions: Arc<dyn PositionRepository>,
        remote: Arc<dyn PositionRemote>,
        clock: Arc<dyn Clock>,
        spawner: Arc<dyn TaskSpawner>,
        config: TrackerConfig,
        event_bus: Option<EventBus>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            positions,
            remote,
            clock,
            spawner,
            config,
            event_bus,
            tracker: Mutex::new(None),
            engine: Mutex::new(Weak::new()),
            sync_gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Subscribe to `engine` and use it for startup seeks.
    ///
    /// Must be repeated after [`PlaybackEngine::reset`], which drops every
    /// subscription.
    pub fn attach(&self, engine: &Arc<PlaybackEngine>) {
        *self.engine.lock() = Arc::downgrade(engine);
        if let Some(this) = self.this.upgrade() {
            engine.subscribe(this);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn book(&self) -> Option<String> {
        self.tracker.lock().as_ref().map(|t| t.book().to_string())
    }

    pub fn current(&self) -> Option<PositionRecord> {
        self.tracker.lock().as_ref().map(|t| t.current().clone())
    }

    /// Finalized records of the active book, oldest first.
    pub fn history(&self) -> Vec<PositionRecord> {
        self.tracker
            .lock()
            .as_ref()
            .map(|t| t.history().to_vec())
            .unwrap_or_default()
    }

    /// Finalized records followed by the current record.
    pub fn positions(&self) -> Vec<PositionRecord> {
        self.tracker
            .lock()
            .as_ref()
            .map(|t| {
                let mut records = t.history().to_vec();
                records.push(t.current().clone());
                records
            })
            .unwrap_or_default()
    }

    pub fn mode(&self) -> Option<TrackingMode> {
        self.tracker.lock().as_ref().map(PositionTracker::mode)
    }

    fn with_tracker<R>(&self, book: &str, f: impl FnOnce(&mut PositionTracker) -> R) -> Option<R> {
        let mut tracker = self.tracker.lock();
        tracker.as_mut().filter(|t| t.book() == book).map(f)
    }

    // ========================================================================
    // Book selection
    // ========================================================================

    /// Make `book` the active book.
    ///
    /// Resets all in-memory state and runs the initial sync. When the
    /// resulting history is non-empty and the fresh current record has no
    /// server identity, the most recent record becomes current and the
    /// attached engine seeks to it.
    ///
    /// # Returns
    /// The adopted record, if any.
    ///
    /// # Errors
    /// Only local store failures are returned.
    #[instrument(skip(self))]
    pub async fn set_book(&self, book: &str) -> Result<Option<PositionRecord>> {
        let now = self.clock.unix_timestamp_millis();
        *self.tracker.lock() = Some(PositionTracker::new(book, now, self.config));
        info!("Tracking positions");

        let outcome = self.run_pipeline(book, None).await?;
        let synced_at = self.clock.unix_timestamp_millis();

        let adopted = self
            .with_tracker(book, |tracker| {
                tracker.mark_synced(synced_at);
                if !outcome.is_merged() {
                    tracker.hydrate(outcome.records());
                }
                tracker.adopt_latest()
            })
            .flatten();

        if let Some(record) = &adopted {
            debug!(position = record.position, "Resuming at latest position");
            let engine = self.engine.lock().upgrade();
            if let Some(engine) = engine {
                engine.set_startup_position(record.position);
            }
        }
        Ok(adopted)
    }

    /// Forget the active book. Later events are ignored and pipelines still
    /// in flight only update the store.
    pub fn clear(&self) {
        if let Some(tracker) = self.tracker.lock().take() {
            info!(book = %tracker.book(), "Stopped tracking positions");
        }
    }

    // ========================================================================
    // Event handling
    // ========================================================================

    /// Apply a playback event to the active book's tracker, dispatching a
    /// sync pipeline when one is due.
    pub fn observe(&self, event: &PlaybackEvent) {
        let now = self.clock.unix_timestamp_millis();
        let job = {
            let mut tracker = self.tracker.lock();
            let Some(tracker) = tracker.as_mut() else {
                return;
            };
            tracker
                .observe(event, now)
                .map(|record| (tracker.book().to_string(), record))
        };

        if let Some((book, record)) = job {
            self.dispatch(book, record);
        }
    }

    fn dispatch(&self, book: String, record: PositionRecord) {
        let Some(this) = self.this.upgrade() else {
            return;
        };
        debug!(book = %book, position = record.position, "Dispatching position sync");
        self.spawner.spawn(Box::pin(async move {
            if let Err(e) = this.run_pipeline(&book, Some(record)).await {
                warn!(book = %book, error = %e, "Position sync pipeline failed");
            }
        }));
    }

    /// Persist and push the current record of the active book now.
    ///
    /// # Errors
    /// `NoActiveBook` before [`set_book`](Self::set_book); local store
    /// failures.
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        let (book, record) = {
            let mut tracker = self.tracker.lock();
            let tracker = tracker.as_mut().ok_or(SyncError::NoActiveBook)?;
            tracker.mark_synced(self.clock.unix_timestamp_millis());
            (tracker.book().to_string(), tracker.current().clone())
        };
        self.run_pipeline(&book, Some(record)).await
    }

    // ========================================================================
    // Sync pipeline
    // ========================================================================

    /// Run the sync pipeline for `book`, persisting `record` first.
    ///
    /// In-memory state is only touched while `book` is still the active
    /// book.
    #[instrument(skip(self, record), fields(has_record = record.is_some()))]
    pub async fn run_pipeline(
        &self,
        book: &str,
        record: Option<PositionRecord>,
    ) -> Result<SyncOutcome> {
        let _gate = self.sync_gate.lock().await;

        let pushed = match record {
            Some(record) => self.persist(book, record).await?,
            None => None,
        };

        let local = self.positions.find_by_book(book).await?;
        let canonical = match self.remote.push(book, &local).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Position sync failed, keeping local records");
                self.emit(SyncEvent::Failed {
                    book: book.to_string(),
                    message: e.to_string(),
                });
                return Ok(SyncOutcome::Offline(local));
            }
        };

        let canonical: Vec<PositionRecord> = canonical
            .into_iter()
            .filter(|r| {
                let same_book = r.book == book;
                if !same_book {
                    warn!(other = %r.book, "Dropping record for another book");
                }
                same_book
            })
            .collect();

        if canonical.is_empty() {
            debug!("Remote returned no positions");
            return Ok(SyncOutcome::NoUpdate(local));
        }

        let stored = self.positions.replace_for_book(book, &canonical).await?;
        self.with_tracker(book, |tracker| tracker.merge(&stored, pushed.as_deref()));

        debug!(records = stored.len(), "Positions synchronized");
        self.emit(SyncEvent::Completed {
            book: book.to_string(),
            records: stored.len(),
        });
        Ok(SyncOutcome::Merged(stored))
    }

    /// Upsert `record`, reusing identifiers already known in memory.
    /// Returns the record's session identifier.
    async fn persist(&self, book: &str, mut record: PositionRecord) -> Result<Option<String>> {
        let session = record.client_id.clone();
        if let Some(session) = &session {
            if let Some((local_id, sync_id)) = self
                .with_tracker(book, |tracker| tracker.ids_for(session))
                .flatten()
            {
                record.local_id = local_id.or(record.local_id);
                record.sync_id = sync_id.or(record.sync_id);
            }
        }

        let local_id = self.positions.upsert(&record).await?;
        if let Some(session) = &session {
            self.with_tracker(book, |tracker| tracker.write_back_local_id(session, local_id));
        }
        Ok(session)
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(event_bus) = &self.event_bus {
            event_bus.emit(CoreEvent::Sync(event)).ok();
        }
    }
}

impl PlaybackListener for PositionReconciler {
    fn on_event(&self, event: &PlaybackEvent) {
        self.observe(event);
    }
}

impl std::fmt::Debug for PositionReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionReconciler")
            .field("book", &self.book())
            .field("mode", &self.mode())
            .field("config", &self.config)
            .finish()
    }
}

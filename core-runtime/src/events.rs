//! # Event Bus System
//!
//! Broadcast channel for coarse-grained client notifications using
//! `tokio::sync::broadcast`. Hosts subscribe to learn about cache downloads and
//! position sync outcomes without polling the core.
//!
//! Playback lifecycle events do not travel through this bus. They are
//! delivered synchronously to `core_playback::PlaybackListener`s because the
//! position reconciler depends on their exact order.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐    emit     ┌───────────┐
//! │ Cache Manager ├────────────>│           │    subscribe   ┌────────────┐
//! └───────────────┘             │ EventBus  ├───────────────>│ Subscriber │
//! ┌───────────────┐    emit     │ (broadcast│                └────────────┘
//! │  Reconciler   ├────────────>│  channel) │
//! └───────────────┘             └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Cache(CacheEvent::Removed {
//!         book: "dune.m4b".to_string(),
//!     }))
//!     .ok();
//!
//! assert!(subscriber.try_recv().is_ok());
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; keep reading.
//! - **`RecvError::Closed`**: all senders dropped; treat as shutdown.
//!
//! Emitting with no subscribers returns an error that callers ignore with
//! `.ok()`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Book and cover cache events
    Cache(CacheEvent),
    /// Position synchronization events
    Sync(SyncEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Cache(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Cache(CacheEvent::DownloadFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Warning,
            CoreEvent::Cache(CacheEvent::Cached { .. }) => EventSeverity::Info,
            CoreEvent::Cache(CacheEvent::Removed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Book identifier the event refers to.
    pub fn book(&self) -> &str {
        match self {
            CoreEvent::Cache(CacheEvent::DownloadStarted { book })
            | CoreEvent::Cache(CacheEvent::Cached { book, .. })
            | CoreEvent::Cache(CacheEvent::Removed { book })
            | CoreEvent::Cache(CacheEvent::DownloadFailed { book, .. })
            | CoreEvent::Sync(SyncEvent::Completed { book, .. })
            | CoreEvent::Sync(SyncEvent::Failed { book, .. }) => book,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events emitted while books are downloaded into or removed from the local
/// store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// Whole-book download started.
    DownloadStarted { book: String },
    /// Book audio stored locally.
    Cached {
        book: String,
        /// Size of the stored payload.
        bytes: u64,
    },
    /// Book audio removed from the local store.
    Removed { book: String },
    /// Download ended without storing anything.
    DownloadFailed { book: String, message: String },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::DownloadStarted { .. } => "Book download started",
            CacheEvent::Cached { .. } => "Book cached",
            CacheEvent::Removed { .. } => "Book removed from cache",
            CacheEvent::DownloadFailed { .. } => "Book download failed",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Outcome of a position synchronization push.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Remote returned a canonical record set that replaced the local one.
    Completed {
        book: String,
        /// Number of records in the canonical set.
        records: usize,
    },
    /// Push failed; local records were left untouched.
    Failed { book: String, message: String },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Completed { .. } => "Positions synchronized",
            SyncEvent::Failed { .. } => "Position sync failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cloning the bus yields another handle to the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let sync_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Sync(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Only events about `book` are returned by `recv()`.
    pub fn for_book(self, book: impl Into<String>) -> Self {
        let book = book.into();
        self.filter(move |event| event.book() == book)
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }
}

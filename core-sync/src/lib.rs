//! # Position Sync Module
//!
//! Tracks listening positions and reconciles them with the remote store.
//!
//! ## Overview
//!
//! Listening history for a book is a list of position records. One record is
//! "current" and is extended while playback is continuous; a discontinuity
//! that outlasts the new-position delay, or a pause, finalizes it and starts
//! a new one. Records are persisted locally and pushed to the server, whose
//! answer is the canonical set for the book.
//!
//! ## Components
//!
//! - **Tracker** (`tracker`): Pure state machine deciding extend vs. split
//! - **Remote** (`remote`): `PATCH` of the full record set, canonical set back
//! - **Reconciler** (`reconciler`): Engine listener running the store/remote
//!   pipeline and the book-open resume

pub mod error;
pub mod reconciler;
pub mod remote;
pub mod tracker;

pub use error::{Result, SyncError};
pub use reconciler::{PositionReconciler, SyncOutcome};
pub use remote::{HttpPositionRemote, PositionRemote};
pub use tracker::{PositionTracker, TrackerConfig, TrackingMode};

//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the audiobook client core:
//! - Logging and tracing infrastructure
//! - Client configuration and remote endpoint layout
//! - Event bus for cache and sync notifications
//!
//! Every other core crate depends on this one for its configuration types and
//! logging conventions.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{ApiEndpoints, ClientConfig, ClientConfigBuilder};
pub use error::{Error, Result};
pub use events::{CacheEvent, CoreEvent, EventBus, SyncEvent};

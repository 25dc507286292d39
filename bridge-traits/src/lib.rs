//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the audiobook client core and
//! platform-specific implementations. Each trait represents a capability that
//! the core requires but that must be implemented differently per platform
//! (desktop, mobile, web).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry
//!
//! ### Media
//! - [`MediaElement`](media::MediaElement) - The single media playback handle
//! - [`MediaSession`](media::MediaSession) - OS "now playing" surface
//!
//! ### Platform Integration
//! - [`TaskSpawner`](background::TaskSpawner) - Fire-and-forget async work
//! - [`StoragePersistence`](storage::StoragePersistence) - Eviction-proof storage request
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](logger::LoggerSink) - Forward core log events to the host logger
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ In Progress |
//! | Web      | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for consistent
//! error handling. Platform implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Provide actionable error messages
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync` on native targets (see
//! [`PlatformSendSync`](platform::PlatformSendSync)); on `wasm32` the bounds
//! are lifted so browser objects can implement them directly.

pub mod background;
pub mod error;
pub mod http;
pub mod logger;
pub mod media;
pub mod platform;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use background::TaskSpawner;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use media::{AudioSource, MediaAction, MediaElement, MediaSession, NowPlaying};
pub use platform::{PlatformBoxFuture, PlatformSendSync};
pub use storage::StoragePersistence;
pub use logger::{LogEntry, LogLevel, LoggerSink};
pub use time::{Clock, ManualClock, SystemClock};

//! # Local Store & Library Access
//!
//! Owns the client's durable state and the thin remote library calls.
//!
//! ## Overview
//!
//! This crate manages:
//! - SQLite schema, migrations and connection pooling (`db`)
//! - Repositories for cached books, covers and position records
//!   (`repositories`), with an in-memory fallback
//! - Domain models shared by every other crate (`models`)
//! - Library listing and metadata fetch with offline fallbacks (`catalog`)

pub mod catalog;
pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use catalog::LibraryService;
pub use error::{LibraryError, Result};
pub use models::{BookAsset, Chapter, CoverAsset, Format, Metadata, PositionRecord, Tags};
pub use repositories::{
    BookRepository, CoverRepository, LocalStore, MemoryStore, PositionRepository,
};

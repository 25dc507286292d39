//! # Local Store Repositories
//!
//! Three keyed collections make up the client's durable state:
//!
//! - `BookRepository` - cached book audio, keyed by book identifier
//! - `CoverRepository` - cached cover images, keyed by book identifier
//! - `PositionRepository` - position records, auto-incrementing key with a
//!   secondary index on book
//!
//! Each trait has a SQLite implementation backed by sqlx, and [`MemoryStore`]
//! implements all of them for degraded sessions. [`LocalStore`] bundles one
//! implementation of each for injection into the other components.

pub mod book;
pub mod cover;
pub mod memory;
pub mod position;

pub use book::{BookRepository, SqliteBookRepository};
pub use cover::{CoverRepository, SqliteCoverRepository};
pub use memory::MemoryStore;
pub use position::{PositionRepository, SqlitePositionRepository};

use crate::db::{create_pool, DatabaseConfig};
use crate::error::Result;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Handles to the three local collections.
#[derive(Clone)]
pub struct LocalStore {
    pub books: Arc<dyn BookRepository>,
    pub covers: Arc<dyn CoverRepository>,
    pub positions: Arc<dyn PositionRepository>,
    persistent: bool,
}

impl LocalStore {
    /// Repositories over an existing, migrated pool.
    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            books: Arc::new(SqliteBookRepository::new(pool.clone())),
            covers: Arc::new(SqliteCoverRepository::new(pool.clone())),
            positions: Arc::new(SqlitePositionRepository::new(pool)),
            persistent: true,
        }
    }

    /// Volatile store; nothing survives the process.
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            books: store.clone(),
            covers: store.clone(),
            positions: store,
            persistent: false,
        }
    }

    /// Open the SQLite store described by `config`, running migrations.
    pub async fn open(config: DatabaseConfig) -> Result<Self> {
        let persistent = !config.is_in_memory();
        let pool = create_pool(config).await?;
        Ok(Self {
            persistent,
            ..Self::sqlite(pool)
        })
    }

    /// Whether data written through this store survives a restart.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("persistent", &self.persistent)
            .finish()
    }
}

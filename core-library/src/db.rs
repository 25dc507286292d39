//! # Local Store Database
//!
//! Opens the SQLite file behind the local store and applies the embedded
//! migrations.
//!
//! The store holds whole audiobooks as blobs next to small, frequently
//! rewritten position rows, so the file runs in WAL mode with `NORMAL`
//! synchronous writes and a busy timeout that covers a blob write on a slow
//! disk. An in-memory database is pinned to one connection, since every
//! SQLite connection to `:memory:` opens its own empty database.
//!
//! ```rust,ignore
//! use core_library::db::{create_pool, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new(data_dir.join("audiobooks.db"))).await?;
//! let store = LocalStore::sqlite(pool);
//! ```

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const DEFAULT_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub location: DatabaseLocation,
    /// Pool size for a file database; in-memory pools always hold one.
    pub max_connections: u32,
    /// How long a writer waits for the database lock.
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    /// Database file at `path`, created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: DatabaseLocation::File(path.into()),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: DatabaseLocation::Memory,
            max_connections: 1,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.location == DatabaseLocation::Memory
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            DatabaseLocation::File(path) => Some(path),
            DatabaseLocation::Memory => None,
        }
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions> {
        let options = match &self.location {
            DatabaseLocation::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
            DatabaseLocation::Memory => {
                SqliteConnectOptions::from_str("sqlite::memory:").map_err(LibraryError::Database)?
            }
        };
        Ok(options
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(self.busy_timeout))
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let pool = SqlitePoolOptions::new().min_connections(1);
        if self.is_in_memory() {
            pool.max_connections(1).max_lifetime(None).idle_timeout(None)
        } else {
            pool.max_connections(self.max_connections.max(1))
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Open the database described by `config` and bring its schema up to date.
///
/// # Errors
///
/// `Database` when the file cannot be opened or created, `Migration` when
/// the schema cannot be applied.
#[instrument(skip(config), fields(file = ?config.path().and_then(Path::file_name)))]
pub async fn create_pool(config: DatabaseConfig) -> Result<SqlitePool> {
    let pool = config
        .pool_options()
        .connect_with(config.connect_options()?)
        .await
        .map_err(|e| {
            warn!(error = %e, "Cannot open local store database");
            LibraryError::Database(e)
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        warn!(error = %e, "Local store migration failed");
        LibraryError::Migration(e.to_string())
    })?;

    info!(in_memory = config.is_in_memory(), "Local store database ready");
    Ok(pool)
}

/// Migrated in-memory pool.
pub async fn create_test_pool() -> Result<SqlitePool> {
    debug!("Opening in-memory local store database");
    create_pool(DatabaseConfig::in_memory()).await
}

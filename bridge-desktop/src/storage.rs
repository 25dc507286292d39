//! Durable storage for desktop hosts.
//!
//! Desktop storage is never evicted by the platform. "Persisting" means making
//! sure the application data directory exists so the SQLite store can be
//! created in it.

use async_trait::async_trait;
use bridge_traits::{error::Result, storage::StoragePersistence};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const APP_DIR: &str = "audiobook-client";
const DATABASE_FILE: &str = "audiobooks.db";

/// Per-user application data directory, if the platform defines one.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR))
}

/// Default SQLite database location inside [`default_data_dir`].
pub fn default_database_path() -> Option<PathBuf> {
    default_data_dir().map(|dir| dir.join(DATABASE_FILE))
}

#[derive(Debug, Clone)]
pub struct DesktopStoragePersistence {
    data_dir: Option<PathBuf>,
}

impl DesktopStoragePersistence {
    /// Persistence rooted at `data_dir`; `None` means nothing needs creating.
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }
}

impl Default for DesktopStoragePersistence {
    fn default() -> Self {
        Self::new(default_data_dir())
    }
}

#[async_trait]
impl StoragePersistence for DesktopStoragePersistence {
    async fn persist(&self) -> Result<bool> {
        if let Some(dir) = &self.data_dir {
            tokio::fs::create_dir_all(dir).await?;
            info!(path = %dir.display(), "Data directory ready");
        } else {
            debug!("No data directory configured");
        }
        Ok(true)
    }

    async fn is_persisted(&self) -> Result<bool> {
        match &self.data_dir {
            Some(dir) => Ok(tokio::fs::try_exists(dir).await?),
            None => Ok(true),
        }
    }
}

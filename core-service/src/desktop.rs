//! Desktop bootstrap.

use crate::error::{Result, ServiceError};
use crate::{CoreDependencies, CoreService};
use bridge_desktop::{
    default_data_dir, DesktopStoragePersistence, ReqwestHttpClient, TokioTaskSpawner,
};
use bridge_traits::media::MediaElement;
use bridge_traits::storage::StoragePersistence;
use bridge_traits::time::SystemClock;
use core_library::db::DatabaseConfig;
use core_library::LocalStore;
use core_runtime::config::ClientConfig;
use core_runtime::logging::{init_logging, LoggingConfig};
use std::sync::Arc;
use tracing::{debug, warn};

/// Open the local store described by `config`.
///
/// A configured database that cannot be opened degrades to the in-memory
/// store; the session then works but nothing survives a restart.
pub async fn open_local_store(config: &ClientConfig) -> LocalStore {
    let Some(path) = &config.database_path else {
        return LocalStore::in_memory();
    };

    match LocalStore::open(DatabaseConfig::new(path)).await {
        Ok(store) => store,
        Err(e) => {
            warn!(
                error = %e,
                path = %path.display(),
                "Local store unavailable, running in memory"
            );
            LocalStore::in_memory()
        }
    }
}

/// Build a [`CoreService`] on the desktop bridges.
///
/// Must run inside a Tokio runtime. The host supplies the media handle.
/// `logging` installs the process subscriber; a subscriber the host already
/// installed is left in place. The data directory is created before the
/// store is opened, which counts as the startup persistence request.
///
/// # Errors
///
/// Fails when the configuration is invalid, the log filter does not parse,
/// or a desktop bridge cannot be created.
pub async fn bootstrap_desktop(
    config: ClientConfig,
    logging: LoggingConfig,
    media: Arc<dyn MediaElement>,
) -> Result<CoreService> {
    match init_logging(logging) {
        Ok(()) => {}
        Err(core_runtime::Error::Logging(e)) => {
            debug!(error = %e, "Keeping existing tracing subscriber");
        }
        Err(e) => return Err(e.into()),
    }

    let http = ReqwestHttpClient::new()
        .map_err(|e| ServiceError::InitializationFailed(e.to_string()))?;
    let spawner =
        TokioTaskSpawner::new().map_err(|e| ServiceError::InitializationFailed(e.to_string()))?;

    let data_dir = config
        .database_path
        .as_ref()
        .and_then(|path| path.parent().map(|dir| dir.to_path_buf()))
        .filter(|dir| !dir.as_os_str().is_empty())
        .or_else(default_data_dir);
    let storage = DesktopStoragePersistence::new(data_dir);
    if let Err(e) = storage.persist().await {
        warn!(error = %e, "Persistent storage request failed");
    }

    let store = open_local_store(&config).await;
    let deps = CoreDependencies::new(
        Arc::new(http),
        media,
        Arc::new(SystemClock),
        Arc::new(spawner),
        Arc::new(storage),
        store,
    );

    CoreService::new(config, deps)
}

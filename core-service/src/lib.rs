//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, media handle,
//! clock, task spawner, storage persistence) and the local store into the
//! shared core: library access, book cache, playback engine and position
//! reconciler. Desktop apps typically enable the `desktop-shims` feature
//! (which depends on `bridge-desktop`).

pub mod error;
mod player;

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
mod desktop;

pub use error::{Result, ServiceError};
pub use player::{CoverImage, PlayerSession};

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub use desktop::{bootstrap_desktop, open_local_store};

use std::sync::Arc;

use bridge_traits::{
    background::TaskSpawner,
    http::HttpClient,
    media::{MediaElement, MediaSession},
    storage::StoragePersistence,
    time::Clock,
};
use core_library::{LibraryService, LocalStore};
use core_playback::{CacheConfig, CacheManager, EngineConfig, PlaybackEngine};
use core_runtime::config::ClientConfig;
use core_runtime::events::{EventBus, EventStream};
use core_sync::{HttpPositionRemote, PositionReconciler, PositionRemote, TrackerConfig};
use tracing::{info, warn};

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub media: Arc<dyn MediaElement>,
    pub media_session: Option<Arc<dyn MediaSession>>,
    pub clock: Arc<dyn Clock>,
    pub spawner: Arc<dyn TaskSpawner>,
    pub storage: Arc<dyn StoragePersistence>,
    pub store: LocalStore,
    /// Position remote override; defaults to HTTP against the configured
    /// base URL.
    pub positions_remote: Option<Arc<dyn PositionRemote>>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        media: Arc<dyn MediaElement>,
        clock: Arc<dyn Clock>,
        spawner: Arc<dyn TaskSpawner>,
        storage: Arc<dyn StoragePersistence>,
        store: LocalStore,
    ) -> Self {
        Self {
            http_client,
            media,
            media_session: None,
            clock,
            spawner,
            storage,
            store,
            positions_remote: None,
        }
    }

    pub fn with_media_session(mut self, session: Arc<dyn MediaSession>) -> Self {
        self.media_session = Some(session);
        self
    }

    pub fn with_positions_remote(mut self, remote: Arc<dyn PositionRemote>) -> Self {
        self.positions_remote = Some(remote);
        self
    }
}

/// Primary façade exposed to host applications.
pub struct CoreService {
    config: ClientConfig,
    deps: Arc<CoreDependencies>,
    event_bus: EventBus,
    library: Arc<LibraryService>,
    cache: Arc<CacheManager>,
    reconciler: Arc<PositionReconciler>,
    player: PlayerSession,
}

impl CoreService {
    /// Create a new service from the provided configuration and dependencies.
    ///
    /// # Errors
    ///
    /// Fails when `config` does not validate.
    pub fn new(config: ClientConfig, deps: CoreDependencies) -> Result<Self> {
        Self::with_cache_config(config, deps, CacheConfig::default())
    }

    pub fn with_cache_config(
        config: ClientConfig,
        deps: CoreDependencies,
        cache_config: CacheConfig,
    ) -> Result<Self> {
        config.validate()?;
        let endpoints = config.endpoints();
        let event_bus = EventBus::new(config.event_buffer_size);

        let library = Arc::new(LibraryService::new(
            Arc::clone(&deps.http_client),
            Arc::clone(&deps.store.books),
            endpoints.clone(),
        ));

        let cache = Arc::new(
            CacheManager::new(
                cache_config,
                Arc::clone(&deps.http_client),
                deps.store.clone(),
                endpoints.clone(),
            )?
            .with_event_bus(event_bus.clone()),
        );

        let mut engine = PlaybackEngine::new(Arc::clone(&deps.media), EngineConfig::from(&config));
        if let Some(session) = &deps.media_session {
            engine = engine.with_media_session(Arc::clone(session));
        }
        let engine = Arc::new(engine);

        let remote: Arc<dyn PositionRemote> = match &deps.positions_remote {
            Some(remote) => Arc::clone(remote),
            None => Arc::new(HttpPositionRemote::new(
                Arc::clone(&deps.http_client),
                endpoints.clone(),
            )),
        };
        let reconciler = PositionReconciler::new(
            Arc::clone(&deps.store.positions),
            remote,
            Arc::clone(&deps.clock),
            Arc::clone(&deps.spawner),
            TrackerConfig::from(&config),
            Some(event_bus.clone()),
        );

        let player = PlayerSession::new(
            engine,
            Arc::clone(&reconciler),
            Arc::clone(&cache),
            Arc::clone(&library),
            endpoints,
        );

        info!(
            base_url = %config.base_url,
            persistent = deps.store.is_persistent(),
            "Core service created"
        );

        Ok(Self {
            config,
            deps: Arc::new(deps),
            event_bus,
            library,
            cache,
            reconciler,
            player,
        })
    }

    /// Ask the host to keep local data durable.
    ///
    /// Failure is logged, never returned.
    ///
    /// # Returns
    /// Whether persistence was granted.
    pub async fn startup(&self) -> bool {
        match self.deps.storage.persist().await {
            Ok(true) => {
                info!("Persistent storage granted");
                true
            }
            Ok(false) => {
                warn!("Persistent storage declined; cached books may be evicted");
                false
            }
            Err(e) => {
                warn!(error = %e, "Persistent storage request failed");
                false
            }
        }
    }

    /// Book identifiers for the library screen.
    ///
    /// # Errors
    ///
    /// Only a local store failure during the offline fallback.
    pub async fn list_books(&self) -> Result<Vec<String>> {
        Ok(self.library.list_books().await?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }

    pub fn library(&self) -> &Arc<LibraryService> {
        &self.library
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub fn engine(&self) -> &Arc<PlaybackEngine> {
        self.player.engine()
    }

    pub fn reconciler(&self) -> &Arc<PositionReconciler> {
        &self.reconciler
    }

    pub fn player(&self) -> &PlayerSession {
        &self.player
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// New subscription to cache and sync events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }
}

//! Player-screen flows through the assembled core service.

use bridge_traits::background::TaskSpawner;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::media::{AudioSource, MediaElement};
use bridge_traits::platform::PlatformBoxFuture;
use bridge_traits::storage::StoragePersistence;
use bridge_traits::time::ManualClock;
use bytes::Bytes;
use core_library::models::{BookAsset, PositionRecord};
use core_library::LocalStore;
use core_playback::{CacheState, TimeDisplay};
use core_runtime::config::{ApiEndpoints, ClientConfig};
use core_runtime::events::{CacheEvent, CoreEvent};
use core_service::{CoreDependencies, CoreService, CoverImage, ServiceError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const BOOK: &str = "dune.m4b";

#[derive(Default)]
struct FakeHttp {
    routes: Mutex<HashMap<String, HttpResponse>>,
    offline: AtomicBool,
}

impl FakeHttp {
    fn route(&self, url: String, status: u16, body: impl Into<Bytes>) {
        self.routes
            .lock()
            .insert(url, HttpResponse::new(status, body));
    }
}

#[async_trait::async_trait]
impl HttpClient for FakeHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("offline".to_string()));
        }
        Ok(self
            .routes
            .lock()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, "")))
    }
}

#[derive(Default)]
struct FakeMedia {
    time: Mutex<f64>,
    loaded: Mutex<Vec<AudioSource>>,
}

impl MediaElement for FakeMedia {
    fn load(&self, source: &AudioSource) {
        *self.time.lock() = 0.0;
        self.loaded.lock().push(source.clone());
    }
    fn play(&self) -> BridgeResult<()> {
        Ok(())
    }
    fn pause(&self) {}
    fn seek(&self, seconds: f64) {
        *self.time.lock() = seconds;
    }
    fn current_time(&self) -> f64 {
        *self.time.lock()
    }
    fn duration(&self) -> Option<f64> {
        None
    }
    fn is_paused(&self) -> bool {
        true
    }
    fn detach(&self) {}
}

/// Drops background pipelines; these tests only observe foreground effects.
struct DiscardSpawner;

impl TaskSpawner for DiscardSpawner {
    fn spawn(&self, _task: PlatformBoxFuture<'static, ()>) {}
}

struct FakeStorage {
    answer: Mutex<Option<bool>>,
}

#[async_trait::async_trait]
impl StoragePersistence for FakeStorage {
    async fn persist(&self) -> BridgeResult<bool> {
        match *self.answer.lock() {
            Some(granted) => Ok(granted),
            None => Err(BridgeError::PersistenceDenied("quota".to_string())),
        }
    }
}

struct Fixture {
    http: Arc<FakeHttp>,
    media: Arc<FakeMedia>,
    storage: Arc<FakeStorage>,
    store: LocalStore,
    endpoints: ApiEndpoints,
    service: CoreService,
}

fn fixture() -> Fixture {
    let http = Arc::new(FakeHttp::default());
    let media = Arc::new(FakeMedia::default());
    let storage = Arc::new(FakeStorage {
        answer: Mutex::new(Some(true)),
    });
    let store = LocalStore::in_memory();
    let config = ClientConfig::default();
    let endpoints = config.endpoints();

    let deps = CoreDependencies::new(
        http.clone(),
        media.clone(),
        Arc::new(ManualClock::new(1_700_000_000_000)),
        Arc::new(DiscardSpawner),
        storage.clone(),
        store.clone(),
    );
    let service = CoreService::new(config, deps).unwrap();

    Fixture {
        http,
        media,
        storage,
        store,
        endpoints,
        service,
    }
}

fn metadata_json() -> &'static str {
    r#"{
        "chapters": [
            {"id": 0, "start_time": "0.000000", "end_time": "600.000000", "tags": {"title": "One"}},
            {"id": 1, "start_time": "600.000000", "end_time": "3600.000000", "tags": {"title": "Two"}}
        ],
        "format": {"duration": "3600.000000", "tags": {"title": "Dune", "artist": "Frank Herbert"}}
    }"#
}

#[tokio::test]
async fn test_open_uncached_book_streams_and_resumes() {
    let f = fixture();
    f.http.route(f.endpoints.metadata(BOOK), 200, metadata_json());
    f.http.route(
        f.endpoints.positions(BOOK),
        200,
        r#"[{"id":1,"book":"dune.m4b","position":642.0,"timestamp":1000,"client_id":"other-device"}]"#,
    );

    f.service.player().open_book(BOOK).await.unwrap();

    let engine = f.service.engine();
    assert_eq!(
        engine.source(),
        Some(AudioSource::RemoteStream {
            url: f.endpoints.book(BOOK)
        })
    );
    assert_eq!(engine.title().as_deref(), Some("Dune"));
    assert_eq!(engine.chapters().len(), 2);
    assert_eq!(f.media.current_time(), 642.0);
    assert_eq!(engine.current_chapter().map(|c| c.index), Some(1));

    assert_eq!(f.service.player().book().as_deref(), Some(BOOK));
    assert_eq!(
        f.service.player().cover(),
        Some(CoverImage::Remote(f.endpoints.cover(BOOK)))
    );
    assert_eq!(engine.cover(), Some(f.endpoints.cover(BOOK)));
    assert_eq!(f.service.reconciler().current().unwrap().sync_id, Some(1));
}

#[tokio::test]
async fn test_open_cached_book_plays_local_copy() {
    let f = fixture();
    f.store
        .books
        .put(&BookAsset::new(BOOK, vec![1u8, 2, 3]))
        .await
        .unwrap();
    f.http.route(f.endpoints.metadata(BOOK), 200, metadata_json());
    f.http.route(f.endpoints.cover(BOOK), 200, vec![9u8, 9]);
    f.http.route(f.endpoints.positions(BOOK), 200, "[]");

    f.service.player().open_book(BOOK).await.unwrap();

    assert_eq!(
        f.media.loaded.lock().last(),
        Some(&AudioSource::MemoryBuffer {
            data: Bytes::from_static(&[1, 2, 3])
        })
    );
    match f.service.player().cover() {
        Some(CoverImage::Stored(cover)) => assert_eq!(cover.data.as_ref(), &[9, 9]),
        other => panic!("expected stored cover, got {other:?}"),
    }
    assert_eq!(f.media.current_time(), 0.0);
}

#[tokio::test]
async fn test_open_book_offline_resumes_from_local_position() {
    let f = fixture();
    f.store
        .books
        .put(&BookAsset::new(BOOK, vec![1u8]))
        .await
        .unwrap();
    let mut saved = PositionRecord::new(BOOK, 1234.0, 1_699_999_000_000);
    saved.sync_id = Some(5);
    f.store.positions.upsert(&saved).await.unwrap();
    f.http.offline.store(true, Ordering::SeqCst);

    f.service.player().open_book(BOOK).await.unwrap();

    assert!(f.service.engine().metadata().is_none());
    assert_eq!(f.media.current_time(), 1234.0);
    assert_eq!(f.service.list_books().await.unwrap(), vec![BOOK.to_string()]);
}

#[tokio::test]
async fn test_reopening_replaces_previous_book() {
    let f = fixture();
    f.service.player().open_book(BOOK).await.unwrap();
    f.service.player().open_book("other.m4b").await.unwrap();

    assert_eq!(f.service.player().book().as_deref(), Some("other.m4b"));
    assert_eq!(f.service.reconciler().book().as_deref(), Some("other.m4b"));
    assert_eq!(f.service.engine().listener_count(), 1);
    assert_eq!(f.media.loaded.lock().len(), 2);

    f.service.player().close();
    assert_eq!(f.service.player().book(), None);
    assert_eq!(f.service.engine().listener_count(), 0);
    assert_eq!(f.service.reconciler().book(), None);
    assert!(matches!(
        f.service.reconciler().sync_now().await,
        Err(core_sync::SyncError::NoActiveBook)
    ));
}

#[tokio::test]
async fn test_cache_or_remove_toggles_cache_state() {
    let f = fixture();
    assert!(matches!(
        f.service.player().cache_state().await,
        Err(ServiceError::NoActiveBook)
    ));

    f.http.route(f.endpoints.book(BOOK), 200, vec![7u8; 16]);
    f.service.player().open_book(BOOK).await.unwrap();
    let mut events = f.service.events().for_book(BOOK);

    let player = f.service.player();
    assert_eq!(player.cache_state().await.unwrap(), CacheState::NotCached);
    assert_eq!(player.cache_or_remove().await.unwrap(), CacheState::Cached);
    assert!(f.service.cache().is_cached(BOOK).await.unwrap());
    assert_eq!(player.cache_or_remove().await.unwrap(), CacheState::NotCached);
    assert!(!f.service.cache().is_cached(BOOK).await.unwrap());

    let mut kinds = Vec::new();
    while let Some(Ok(CoreEvent::Cache(event))) = events.try_recv() {
        kinds.push(event);
    }
    assert!(kinds.contains(&CacheEvent::Cached {
        book: BOOK.to_string(),
        bytes: 16
    }));
    assert!(kinds.contains(&CacheEvent::Removed {
        book: BOOK.to_string()
    }));
}

#[tokio::test]
async fn test_failed_download_leaves_book_uncached() {
    let f = fixture();
    f.service.player().open_book(BOOK).await.unwrap();

    let err = f.service.player().cache_or_remove().await.unwrap_err();
    assert!(matches!(err, ServiceError::Playback(_)));
    assert_eq!(
        f.service.player().cache_state().await.unwrap(),
        CacheState::NotCached
    );
}

#[tokio::test]
async fn test_time_display_toggle() {
    let f = fixture();
    f.http.route(f.endpoints.metadata(BOOK), 200, metadata_json());
    f.service.player().open_book(BOOK).await.unwrap();
    f.service.engine().set_position(600.0);

    let player = f.service.player();
    assert_eq!(player.time_display(), TimeDisplay::Remaining);
    assert_eq!(player.time_text(), "-00h 50m 00s");

    assert_eq!(player.toggle_time_display(), TimeDisplay::Elapsed);
    assert_eq!(player.time_text(), "00h 10m 00s");
}

#[tokio::test]
async fn test_startup_requests_persistence_without_failing() {
    let f = fixture();
    assert!(f.service.startup().await);

    *f.storage.answer.lock() = Some(false);
    assert!(!f.service.startup().await);

    *f.storage.answer.lock() = None;
    assert!(!f.service.startup().await);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = ClientConfig {
        jump_step: 0.0,
        ..ClientConfig::default()
    };
    let deps = CoreDependencies::new(
        Arc::new(FakeHttp::default()),
        Arc::new(FakeMedia::default()),
        Arc::new(ManualClock::new(0)),
        Arc::new(DiscardSpawner),
        Arc::new(FakeStorage {
            answer: Mutex::new(Some(true)),
        }),
        LocalStore::in_memory(),
    );

    assert!(matches!(
        CoreService::new(config, deps),
        Err(ServiceError::Config(_))
    ));
}

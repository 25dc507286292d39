//! Tests for the book cache manager
//!
//! These tests drive the cache manager against an in-memory local store and a
//! scripted HTTP client.

use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_library::models::PositionRecord;
use core_library::repositories::LocalStore;
use core_playback::cache::{CacheConfig, CacheManager, CacheState};
use core_playback::PlaybackError;
use core_runtime::config::ApiEndpoints;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

const BOOK: &str = "dune.m4b";

#[derive(Default)]
struct FakeHttp {
    routes: Mutex<HashMap<String, HttpResponse>>,
    requests: Mutex<Vec<String>>,
    offline: AtomicBool,
    gate: Option<Arc<Semaphore>>,
}

impl FakeHttp {
    fn route(&self, url: String, status: u16, body: &'static [u8]) {
        self.routes
            .lock()
            .insert(url, HttpResponse::new(status, body));
    }

    fn request_count(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|u| *u == url).count()
    }
}

#[async_trait::async_trait]
impl HttpClient for FakeHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| BridgeError::OperationFailed(e.to_string()))?
                .forget();
        }
        self.requests.lock().push(request.url.clone());
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

struct Fixture {
    http: Arc<FakeHttp>,
    store: LocalStore,
    endpoints: ApiEndpoints,
    bus: EventBus,
    manager: Arc<CacheManager>,
}

fn fixture_with(http: FakeHttp, config: CacheConfig) -> Fixture {
    let http = Arc::new(http);
    let store = LocalStore::in_memory();
    let endpoints = ApiEndpoints::new("");
    let bus = EventBus::new(16);
    let manager = CacheManager::new(config, http.clone(), store.clone(), endpoints.clone())
        .unwrap()
        .with_event_bus(bus.clone());
    Fixture {
        http,
        store,
        endpoints,
        bus,
        manager: Arc::new(manager),
    }
}

fn fixture() -> Fixture {
    fixture_with(FakeHttp::default(), CacheConfig::default())
}

fn cache_events(receiver: &mut tokio::sync::broadcast::Receiver<CoreEvent>) -> Vec<CacheEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        if let CoreEvent::Cache(event) = event {
            events.push(event);
        }
    }
    events
}

#[tokio::test]
async fn test_cache_book_stores_payload_and_emits_events() {
    let f = fixture();
    f.http.route(f.endpoints.book(BOOK), 200, b"audio-bytes");
    let mut events = f.bus.subscribe();

    let asset = f.manager.cache_book(BOOK).await.unwrap();
    assert_eq!(asset.filename, BOOK);
    assert_eq!(&asset.data[..], b"audio-bytes");

    assert!(f.manager.is_cached(BOOK).await.unwrap());
    assert_eq!(f.manager.get_book_keys().await.unwrap(), vec![BOOK.to_string()]);
    assert_eq!(f.manager.get_book(BOOK).await.unwrap(), Some(asset));
    assert_eq!(f.manager.cache_state(BOOK).await.unwrap(), CacheState::Cached);

    assert_eq!(
        cache_events(&mut events),
        vec![
            CacheEvent::DownloadStarted {
                book: BOOK.to_string()
            },
            CacheEvent::Cached {
                book: BOOK.to_string(),
                bytes: 11
            },
        ]
    );
}

#[tokio::test]
async fn test_recaching_overwrites() {
    let f = fixture();
    f.http.route(f.endpoints.book(BOOK), 200, b"v1");
    f.manager.cache_book(BOOK).await.unwrap();
    f.http.route(f.endpoints.book(BOOK), 200, b"v2");
    f.manager.cache_book(BOOK).await.unwrap();

    let stored = f.manager.get_book(BOOK).await.unwrap().unwrap();
    assert_eq!(&stored.data[..], b"v2");
    assert_eq!(f.manager.get_book_keys().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_download_stores_nothing() {
    let f = fixture();
    f.http.route(f.endpoints.book(BOOK), 500, b"oops");
    let mut events = f.bus.subscribe();

    let err = f.manager.cache_book(BOOK).await.unwrap_err();
    assert!(matches!(
        err,
        PlaybackError::SourceUnavailable { status: 500, .. }
    ));
    assert!(!f.manager.is_cached(BOOK).await.unwrap());
    assert_eq!(
        f.manager.cache_state(BOOK).await.unwrap(),
        CacheState::NotCached
    );

    let events = cache_events(&mut events);
    assert!(matches!(
        events.last(),
        Some(CacheEvent::DownloadFailed { book, .. }) if book == BOOK
    ));
}

#[tokio::test]
async fn test_oversized_book_rejected() {
    let f = fixture_with(FakeHttp::default(), CacheConfig::new().with_max_book_bytes(4));
    f.http.route(f.endpoints.book(BOOK), 200, b"too large");

    let err = f.manager.cache_book(BOOK).await.unwrap_err();
    assert!(matches!(
        err,
        PlaybackError::PayloadTooLarge {
            bytes: 9,
            limit: 4,
            ..
        }
    ));
    assert!(!f.manager.is_cached(BOOK).await.unwrap());
}

#[tokio::test]
async fn test_cache_state_while_downloading() {
    let gate = Arc::new(Semaphore::new(0));
    let http = FakeHttp {
        gate: Some(gate.clone()),
        ..Default::default()
    };
    let f = fixture_with(http, CacheConfig::default());
    f.http.route(f.endpoints.book(BOOK), 200, b"audio");

    let manager = f.manager.clone();
    let download = tokio::spawn(async move { manager.cache_book(BOOK).await });

    while !f.manager.is_downloading(BOOK) {
        tokio::task::yield_now().await;
    }
    assert_eq!(
        f.manager.cache_state(BOOK).await.unwrap(),
        CacheState::Downloading
    );
    assert!(matches!(
        f.manager.cache_book(BOOK).await,
        Err(PlaybackError::DownloadInProgress(_))
    ));

    gate.add_permits(1);
    download.await.unwrap().unwrap();
    assert!(!f.manager.is_downloading(BOOK));
    assert_eq!(f.manager.cache_state(BOOK).await.unwrap(), CacheState::Cached);
}

#[tokio::test]
async fn test_cache_cover_only_persists_success() {
    let f = fixture();
    f.http.route(f.endpoints.cover(BOOK), 404, b"not found");

    let transient = f.manager.cache_cover(BOOK).await.unwrap();
    assert_eq!(&transient.data[..], b"not found");
    assert!(f.manager.get_cover(BOOK).await.unwrap().is_none());

    f.http.route(f.endpoints.cover(BOOK), 200, b"jpeg");
    f.manager.cache_cover(BOOK).await.unwrap();
    let stored = f.manager.get_cover(BOOK).await.unwrap().unwrap();
    assert_eq!(&stored.data[..], b"jpeg");
}

#[tokio::test]
async fn test_remove_book_keeps_cover_and_positions() {
    let f = fixture();
    f.http.route(f.endpoints.book(BOOK), 200, b"audio");
    f.http.route(f.endpoints.cover(BOOK), 200, b"jpeg");
    f.manager.cache_book(BOOK).await.unwrap();
    f.manager.cache_cover(BOOK).await.unwrap();
    f.store
        .positions
        .upsert(&PositionRecord::new(BOOK, 42.0, 1_000))
        .await
        .unwrap();
    let mut events = f.bus.subscribe();

    assert!(f.manager.remove_book(BOOK).await.unwrap());
    assert!(!f.manager.remove_book(BOOK).await.unwrap());

    assert!(!f.manager.is_cached(BOOK).await.unwrap());
    assert!(f.manager.get_cover(BOOK).await.unwrap().is_some());
    let latest = f.manager.latest_position(BOOK).await.unwrap().unwrap();
    assert_eq!(latest.position, 42.0);
    assert_eq!(
        cache_events(&mut events),
        vec![CacheEvent::Removed {
            book: BOOK.to_string()
        }]
    );
}

#[tokio::test]
async fn test_cover_for_view_refreshes_cached_books_only() {
    let f = fixture();
    f.http.route(f.endpoints.cover(BOOK), 200, b"fresh");

    assert!(f.manager.cover_for_view(BOOK).await.is_none());
    assert_eq!(f.http.request_count(&f.endpoints.cover(BOOK)), 0);

    f.http.route(f.endpoints.book(BOOK), 200, b"audio");
    f.manager.cache_book(BOOK).await.unwrap();
    let cover = f.manager.cover_for_view(BOOK).await.unwrap();
    assert_eq!(&cover.data[..], b"fresh");
    assert_eq!(f.http.request_count(&f.endpoints.cover(BOOK)), 1);
}

#[tokio::test]
async fn test_cover_for_view_offline_serves_stored_copy() {
    let f = fixture();
    f.http.route(f.endpoints.book(BOOK), 200, b"audio");
    f.http.route(f.endpoints.cover(BOOK), 200, b"stored");
    f.manager.cache_book(BOOK).await.unwrap();
    f.manager.cache_cover(BOOK).await.unwrap();

    f.http.offline.store(true, Ordering::SeqCst);
    let cover = f.manager.cover_for_view(BOOK).await.unwrap();
    assert_eq!(&cover.data[..], b"stored");
}

#[tokio::test]
async fn test_cover_refresh_can_be_disabled() {
    let f = fixture_with(
        FakeHttp::default(),
        CacheConfig::new().with_cover_refresh(false),
    );
    f.http.route(f.endpoints.book(BOOK), 200, b"audio");
    f.manager.cache_book(BOOK).await.unwrap();

    assert!(f.manager.cover_for_view(BOOK).await.is_none());
    assert_eq!(f.http.request_count(&f.endpoints.cover(BOOK)), 0);
}

#[test]
fn test_invalid_config_rejected() {
    let result = CacheManager::new(
        CacheConfig::new().with_max_book_bytes(0),
        Arc::new(FakeHttp::default()),
        LocalStore::in_memory(),
        ApiEndpoints::default(),
    );
    assert!(matches!(result, Err(PlaybackError::InvalidConfig(_))));
}

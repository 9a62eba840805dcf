//! Realtime fan-out driven through the HTTP API, and state surviving a
//! restart on the JSON file store.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use gatehouse::access::{ClientStatus, DesktopHeuristic, Disabled};
use gatehouse::clock::ManualClock;
use gatehouse::http::{self, AppState, Secrets, ADMIN_PIN_HEADER};
use gatehouse::persistence::{Document, JsonFileStore, MemoryStore, PersistencePort};
use gatehouse::site::SiteEvent;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_PIN: &str = "1111";

fn secrets() -> Secrets {
    Secrets {
        admin_pin: Some(ADMIN_PIN.to_string()),
        ..Secrets::default()
    }
}

fn memory_state(clock: Arc<ManualClock>) -> AppState {
    AppState::new(
        Arc::new(MemoryStore::new()),
        clock,
        Arc::new(Disabled),
        secrets(),
        false,
    )
}

async fn admin_post(app: &Router, path: &str, body: serde_json::Value) -> StatusCode {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(ADMIN_PIN_HEADER, ADMIN_PIN)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

async fn next_event(subscription: &mut gatehouse::site::Subscription) -> SiteEvent {
    tokio::time::timeout(Duration::from_secs(1), subscription.recv())
        .await
        .expect("event within a second")
        .expect("subscription open")
}

// === Realtime ===

#[tokio::test]
async fn test_subscribers_get_snapshot_then_changes() {
    let clock = Arc::new(ManualClock::new(1_000));
    let state = memory_state(clock.clone());
    let app = http::router(state.clone());

    let mut first = state.site.subscribe();
    let mut second = state.site.subscribe();

    for subscription in [&mut first, &mut second] {
        match next_event(subscription).await {
            SiteEvent::State { lockdown, broadcast } => {
                assert!(!lockdown.enabled);
                assert!(broadcast.is_none());
            }
            other => panic!("expected state snapshot, got {other:?}"),
        }
    }

    assert_eq!(admin_post(&app, "/api/broadcast", json!({"message": "hello all"})).await, StatusCode::OK);
    clock.advance(5);
    assert_eq!(admin_post(&app, "/api/lockdown", json!({})).await, StatusCode::OK);

    for subscription in [&mut first, &mut second] {
        match next_event(subscription).await {
            SiteEvent::Broadcast { broadcast: Some(b) } => {
                assert_eq!(b.message, "hello all");
                assert_eq!(b.expires_at, 1_000 + 86_400_000);
            }
            other => panic!("expected broadcast, got {other:?}"),
        }
        assert_eq!(
            next_event(subscription).await,
            SiteEvent::Lockdown {
                enabled: true,
                updated_at: 1_005
            }
        );
    }
}

#[tokio::test]
async fn test_late_subscriber_sees_current_state() {
    let clock = Arc::new(ManualClock::new(50));
    let state = memory_state(clock);
    let app = http::router(state.clone());

    admin_post(&app, "/api/broadcast", json!({"message": "already here"})).await;
    admin_post(&app, "/api/lockdown", json!({})).await;

    let mut late = state.site.subscribe();
    match next_event(&mut late).await {
        SiteEvent::State { lockdown, broadcast } => {
            assert!(lockdown.enabled);
            assert_eq!(broadcast.unwrap().message, "already here");
        }
        other => panic!("expected state snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn test_dropped_subscriber_does_not_block_others() {
    let state = memory_state(Arc::new(ManualClock::new(0)));
    let app = http::router(state.clone());

    let gone = state.site.subscribe();
    let mut kept = state.site.subscribe();
    next_event(&mut kept).await;
    assert_eq!(state.site.channel().subscriber_count(), 2);

    drop(gone);
    assert_eq!(state.site.channel().subscriber_count(), 1);

    admin_post(&app, "/api/clear-lockdown", json!({})).await;
    assert!(matches!(
        next_event(&mut kept).await,
        SiteEvent::Lockdown { enabled: false, .. }
    ));
}

#[tokio::test]
async fn test_unauthorized_change_is_not_published() {
    let state = memory_state(Arc::new(ManualClock::new(0)));
    let app = http::router(state.clone());
    let mut subscription = state.site.subscribe();
    next_event(&mut subscription).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/lockdown")
        .body(Body::empty())
        .unwrap();
    let status = app.clone().oneshot(request).await.unwrap().status();
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let pending = tokio::time::timeout(Duration::from_millis(50), subscription.recv()).await;
    assert!(pending.is_err());
}

// === Restart ===

fn file_state(dir: &TempDir, clock: Arc<ManualClock>) -> AppState {
    AppState::new(
        Arc::new(JsonFileStore::open(dir.path()).unwrap()),
        clock,
        Arc::new(DesktopHeuristic::default()),
        secrets(),
        false,
    )
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(10_000));

    {
        let state = file_state(&dir, clock.clone());
        let app = http::router(state);
        admin_post(&app, "/api/admin/ban", json!({"clientID": "abc", "banMessage": "gone"})).await;
        admin_post(&app, "/api/admin/verify", json!({"clientID": "friend"})).await;
        admin_post(&app, "/api/admin/ban-ip", json!({"ip": "::ffff:1.2.3.4"})).await;
        admin_post(&app, "/api/admin/lockdown", json!({"enabled": true})).await;
        admin_post(&app, "/api/broadcast", json!({"message": "persisted"})).await;
    }

    let state = file_state(&dir, clock);
    let banned = state.access.client("abc").unwrap();
    assert_eq!(banned.status, ClientStatus::Banned);
    assert_eq!(banned.ban_message(), Some("gone"));
    assert_eq!(banned.banned_at, 10_000);
    assert_eq!(state.access.client("friend").unwrap().status, ClientStatus::Verified);
    assert!(state.access.ip_ban("1.2.3.4").is_some());
    assert!(state.access.lockdown());
    assert_eq!(state.site.snapshot().broadcast.unwrap().message, "persisted");
}

#[tokio::test]
async fn test_legacy_document_migrated_on_load() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    store
        .save(
            Document::AccessStore,
            r#"{
                "lockdown": false,
                "clients": {
                    "was-unbanned": {"status": "unbanned", "firstSeenAt": 5, "lastSeenAt": 6},
                    "odd": {"status": "mystery"},
                    "kept": {"status": "banned", "banMessage": "still"}
                },
                "ipBans": {}
            }"#,
        )
        .unwrap();

    let state = file_state(&dir, Arc::new(ManualClock::new(100)));

    let migrated = state.access.client("was-unbanned").unwrap();
    assert_eq!(migrated.status, ClientStatus::Unverified);
    assert_eq!(migrated.first_seen_at, 5);
    assert_eq!(state.access.client("odd").unwrap().status, ClientStatus::Unverified);
    assert_eq!(state.access.client("kept").unwrap().status, ClientStatus::Banned);
}

#[tokio::test]
async fn test_corrupt_document_starts_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("access_store.json"), "{ definitely not json").unwrap();
    std::fs::write(dir.path().join("site_state.json"), "[]").unwrap();

    let state = file_state(&dir, Arc::new(ManualClock::new(0)));
    assert!(state.access.list_clients().is_empty());
    assert!(!state.access.lockdown());
    assert!(!state.site.snapshot().lockdown.enabled);
}

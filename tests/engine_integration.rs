//! End-to-end engine tests: mock feed -> placement -> settlement ->
//! persistence -> resume, plus the HTTP surface.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use tokio::time::Duration;
use tower::ServiceExt;

use pulsebet::api::{create_router, AppState};
use pulsebet::feed::MockFeed;
use pulsebet::store::{MemoryStore, SessionGateway};
use pulsebet::wager::{Direction, Outcome, SessionLedger, Stake, WagerConfig, WagerManager};

fn gateway() -> Arc<SessionGateway> {
    Arc::new(SessionGateway::new(Box::new(MemoryStore::new()), 7))
}

fn manager(feed: &MockFeed, gateway: Arc<SessionGateway>, ledger: SessionLedger) -> WagerManager {
    WagerManager::new(
        WagerConfig::default(),
        ledger,
        feed.price(),
        feed.connectivity(),
        gateway,
    )
}

/// Let armed timers fire; paused time auto-advances past the deadline.
async fn settle_window() {
    tokio::time::sleep(Duration::from_millis(3001)).await;
}

#[tokio::test(start_paused = true)]
async fn full_cycle_settles_persists_and_resumes() {
    let feed = MockFeed::connected(1000);
    let gw = gateway();

    // Session one: win a wager.
    {
        let manager = manager(&feed, gw.clone(), SessionLedger::new(dec!(1000), 0));

        feed.push_price_at(dec!(60000.00), 1_000);
        manager.place_bet(Direction::Up, Stake::Hundred).unwrap();

        feed.push_price_at(dec!(60050.00), 2_000);
        settle_window().await;

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.balance, dec!(1090.0));
        assert_eq!(snapshot.wins, 1);
        assert_eq!(snapshot.history[0].outcome, Outcome::Win);

        manager.shutdown();
    }

    // Session two: the ledger comes back from the store.
    let resumed = gw.load().expect("saved session should load");
    assert_eq!(resumed.balance, dec!(1090.0));
    assert_eq!(resumed.total_wagers, 1);
    assert!(resumed.active_wager.is_none());

    let manager = manager(&feed, gw, resumed);
    feed.push_price_at(dec!(60100.00), 10_000);
    assert!(manager.place_bet(Direction::Down, Stake::Fifty).is_ok());
}

#[tokio::test(start_paused = true)]
async fn resumed_session_never_carries_a_pending_wager() {
    let feed = MockFeed::connected(1000);
    let gw = gateway();

    {
        let manager = manager(&feed, gw.clone(), SessionLedger::new(dec!(1000), 0));
        feed.push_price_at(dec!(60000.00), 1_000);
        manager.place_bet(Direction::Up, Stake::Hundred).unwrap();
        // Teardown mid-wager: timers released, nothing settles.
        manager.shutdown();
    }

    let resumed = gw.load().expect("saved session should load");
    assert!(resumed.active_wager.is_none());
    // Escrow stands; the round trip strips the wager and nothing else.
    assert_eq!(resumed.balance, dec!(900));
    assert_eq!(resumed.total_wagers, 0);
}

#[tokio::test(start_paused = true)]
async fn disconnect_aborts_then_reconnect_allows_betting() {
    let feed = MockFeed::connected(1000);
    let manager = manager(&feed, gateway(), SessionLedger::new(dec!(1000), 0));

    feed.push_price_at(dec!(60000.00), 1_000);
    manager.place_bet(Direction::Up, Stake::Fifty).unwrap();

    feed.set_connected(false);
    tokio::time::sleep(Duration::from_millis(1)).await;

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.balance, dec!(1000));
    assert!(snapshot.history.is_empty());
    assert_eq!(snapshot.total_wagers, 0);

    // While down, placement is rejected outright.
    assert!(manager.place_bet(Direction::Up, Stake::Ten).is_err());

    // Back up: betting resumes.
    feed.set_connected(true);
    assert!(manager.place_bet(Direction::Up, Stake::Ten).is_ok());
}

#[tokio::test(start_paused = true)]
async fn http_surface_drives_a_wager_to_settlement() {
    let feed = MockFeed::connected(1000);
    let gw = gateway();
    let manager = Arc::new(manager(&feed, gw, SessionLedger::new(dec!(1000), 0)));
    let app = create_router(AppState::new(
        manager,
        feed.price(),
        feed.history(),
        feed.connectivity(),
    ));

    feed.push_price_at(dec!(60000.00), 1_000);

    // Place through the API.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/wager")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"direction":"UP","stake":100}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A pending session shows the countdown.
    let session = get_json(&app, "/api/v1/session").await;
    assert!(session["ledger"]["active_wager"].is_object());
    assert!(session["time_remaining_ms"].as_u64().is_some());

    // Price moves, timer fires.
    feed.push_price_at(dec!(60050.00), 2_000);
    settle_window().await;

    let session = get_json(&app, "/api/v1/session").await;
    assert!(session["ledger"]["active_wager"].is_null());
    assert_eq!(session["ledger"]["wins"], 1);
    assert_eq!(session["ledger"]["win_rate"], 100);
    assert_eq!(session["time_remaining_ms"], serde_json::Value::Null);

    // Double-placement guard surfaces as 422 once a new bet is pending.
    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/wager")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"direction":"DOWN","stake":25}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/wager")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"direction":"UP","stake":25}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test(start_paused = true)]
async fn completing_a_session_reports_finals_and_clears_storage() {
    let feed = MockFeed::connected(1000);
    let gw = gateway();
    let manager = Arc::new(manager(&feed, gw.clone(), SessionLedger::new(dec!(1000), 0)));
    let app = create_router(AppState::new(
        manager,
        feed.price(),
        feed.history(),
        feed.connectivity(),
    ));

    feed.push_price_at(dec!(60000.00), 1_000);
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/wager")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"direction":"UP","stake":100}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    feed.push_price_at(dec!(60050.00), 2_000);
    settle_window().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/session/complete")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let finale: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(finale["total_wagers"], 1);
    assert_eq!(finale["win_rate"], 100);

    // The signup collaborator took the stats; the stored session is gone.
    assert!(gw.load().is_none());
}

async fn get_json(app: &axum::Router, uri: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

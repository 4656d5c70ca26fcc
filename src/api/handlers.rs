//! HTTP API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::feed::{PriceHistory, PricePoint, SharedPrice};
use crate::wager::{Direction, SessionLedger, Stake, WagerManager};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Wager lifecycle manager.
    pub manager: Arc<WagerManager>,
    /// Current-price slot.
    pub price: SharedPrice,
    /// Price history buffer.
    pub history: PriceHistory,
    /// Feed connectivity flag.
    pub connectivity: watch::Receiver<bool>,
}

impl AppState {
    /// Assemble state from the engine components.
    pub fn new(
        manager: Arc<WagerManager>,
        price: SharedPrice,
        history: PriceHistory,
        connectivity: watch::Receiver<bool>,
    ) -> Self {
        Self {
            manager,
            price,
            history,
            connectivity,
        }
    }

    /// Whether the feed is connected.
    pub fn is_connected(&self) -> bool {
        *self.connectivity.borrow()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether the feed is connected and bets are permitted.
    pub ready: bool,
}

/// Session state response.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Ledger snapshot.
    pub ledger: SessionLedger,
    /// Feed connectivity flag.
    pub connected: bool,
    /// Milliseconds until settlement of the active wager.
    pub time_remaining_ms: Option<u64>,
}

/// Wager placement request.
#[derive(Debug, Deserialize)]
pub struct PlaceWagerRequest {
    /// Bet direction.
    pub direction: Direction,
    /// Stake amount; must be one of the allowed set.
    pub stake: u64,
}

/// Rejection payload for invalid placements.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable rejection reason.
    pub error: String,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - 200 while the feed is connected, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_connected();
    let response = ReadyResponse { ready: is_ready };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Latest price handler. `null` until the first tick arrives.
pub async fn price(State(state): State<AppState>) -> Json<Option<PricePoint>> {
    Json(state.price.latest())
}

/// Price history handler, oldest first.
pub async fn history(State(state): State<AppState>) -> Json<Vec<PricePoint>> {
    Json(state.history.snapshot())
}

/// Session snapshot handler.
pub async fn session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(SessionResponse {
        ledger: state.manager.snapshot(),
        connected: state.is_connected(),
        time_remaining_ms: state.manager.time_remaining_ms(),
    })
}

/// Wager placement handler. Rejections come back as 422 with the reason;
/// the caller disables controls rather than retrying.
pub async fn place_wager(
    State(state): State<AppState>,
    Json(request): Json<PlaceWagerRequest>,
) -> impl IntoResponse {
    let stake = match Stake::try_from(request.stake) {
        Ok(stake) => stake,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    match state.manager.place_bet(request.direction, stake) {
        Ok(wager) => (StatusCode::OK, Json(wager)).into_response(),
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Session completion handler: final snapshot for the signup payload,
/// then the stored session is cleared.
pub async fn complete_session(State(state): State<AppState>) -> Json<SessionLedger> {
    Json(state.manager.complete_session())
}

//! HTTP API route definitions.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    complete_session, health, history, place_wager, price, ready, session, AppState,
};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Engine endpoints
        .route("/api/v1/price", get(price))
        .route("/api/v1/history", get(history))
        .route("/api/v1/session", get(session))
        .route("/api/v1/wager", post(place_wager))
        .route("/api/v1/session/complete", post(complete_session))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

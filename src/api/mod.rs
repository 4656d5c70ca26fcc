//! HTTP API module: the presentation adapters' read surface plus the
//! wager placement and session-completion operations.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;

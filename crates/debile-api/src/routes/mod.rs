//! API routes.

pub mod health;

use crate::AppState;
use crate::rpc::rpc_handler;
use crate::ws::ws_handler;
use axum::Router;
use axum::routing::{get, post};

/// Build the main API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .merge(health::router())
        .with_state(state)
}

//! snapvault HTTP API.
//!
//! Exposes the inventory context over axum. `main.rs` wires configuration,
//! logging and the storage backend; [`build_router`] is shared with tests.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Builds the full application router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/inventory", routes::inventory::router())
        .with_state(state)
}

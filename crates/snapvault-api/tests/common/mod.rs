//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use snapvault_api::state::AppState;
use snapvault_core::clock::Clock;
use snapvault_core::manifest::AggregateManifest;
use snapvault_core::store::SnapshotStore;
use snapvault_inventory::domain::aggregates::Inventory;
use snapvault_repository::AggregateRepository;
use snapvault_store::{InMemoryManifest, InMemorySnapshotStore, PgAggregateManifest, PgSnapshotStore};
use snapvault_test_support::FixedClock;
use sqlx::PgPool;
use tower::ServiceExt;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::default())
}

fn state_over(store: Arc<dyn SnapshotStore>, manifest: Arc<dyn AggregateManifest>) -> AppState {
    let repository = AggregateRepository::<Inventory>::with_default(store).with_manifest(manifest);
    AppState::new(fixed_clock(), Arc::new(repository))
}

/// State over fresh in-memory backends. Clone it to keep data across
/// requests.
pub fn in_memory_state() -> AppState {
    state_over(
        Arc::new(InMemorySnapshotStore::new()),
        Arc::new(InMemoryManifest::new()),
    )
}

/// State over PostgreSQL backends sharing `pool`.
pub fn pg_state(pool: PgPool) -> AppState {
    state_over(
        Arc::new(PgSnapshotStore::new(pool.clone())),
        Arc::new(PgAggregateManifest::new(pool)),
    )
}

/// Build the full app router. Uses the same route structure as `main.rs`.
pub fn build_test_app(state: AppState) -> Router {
    snapvault_api::build_router(state)
}

/// Send a request with an optional JSON body and return the response. An
/// empty body decodes to `Value::Null`.
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(body)).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, None).await
}

/// Create an inventory and return its id.
pub async fn create_inventory(state: &AppState) -> String {
    let (status, json) =
        send(build_test_app(state.clone()), "POST", "/api/v1/inventory", None).await;
    assert_eq!(status, StatusCode::CREATED);
    json["aggregate_id"].as_str().unwrap().to_owned()
}

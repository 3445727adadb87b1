//! Integration tests for the inventory routes.

mod common;

use axum::http::StatusCode;
use sqlx::PgPool;
use uuid::Uuid;

#[tokio::test]
async fn test_inventory_add_item_round_trip() {
    let state = common::in_memory_state();
    let inventory_id = common::create_inventory(&state).await;
    let item_id = Uuid::new_v4();

    // POST /api/v1/inventory/{id}/items
    let (status, json) = common::post_json(
        common::build_test_app(state.clone()),
        &format!("/api/v1/inventory/{inventory_id}/items"),
        &serde_json::json!({ "item_id": item_id }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["aggregate_id"], inventory_id);
    assert_eq!(json["version"], 2);
    assert_eq!(json["event_ids"].as_array().unwrap().len(), 1);

    // GET /api/v1/inventory/{id} — verify persisted state
    let (status, json) = common::get_json(
        common::build_test_app(state),
        &format!("/api/v1/inventory/{inventory_id}"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["inventory_id"], inventory_id);
    assert_eq!(json["items"], serde_json::json!([item_id]));
    assert_eq!(json["equipped"], serde_json::Value::Null);
    assert_eq!(json["version"], 2);
}

#[tokio::test]
async fn test_inventory_equip_and_remove_lifecycle() {
    let state = common::in_memory_state();
    let inventory_id = common::create_inventory(&state).await;
    let item_id = Uuid::new_v4();
    let body = serde_json::json!({ "item_id": item_id });

    let (status, _) = common::post_json(
        common::build_test_app(state.clone()),
        &format!("/api/v1/inventory/{inventory_id}/items"),
        &body,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = common::post_json(
        common::build_test_app(state.clone()),
        &format!("/api/v1/inventory/{inventory_id}/equip"),
        &body,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = common::get_json(
        common::build_test_app(state.clone()),
        &format!("/api/v1/inventory/{inventory_id}"),
    )
    .await;
    assert_eq!(json["equipped"], item_id.to_string());

    let (status, json) = common::send(
        common::build_test_app(state.clone()),
        "DELETE",
        &format!("/api/v1/inventory/{inventory_id}/items/{item_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["version"], 4);

    let (_, json) = common::get_json(
        common::build_test_app(state),
        &format!("/api/v1/inventory/{inventory_id}"),
    )
    .await;
    assert_eq!(json["items"], serde_json::json!([]));
    assert_eq!(json["equipped"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_inventory_delete_then_get_returns_404() {
    let state = common::in_memory_state();
    let inventory_id = common::create_inventory(&state).await;

    let (status, json) = common::send(
        common::build_test_app(state.clone()),
        "DELETE",
        &format!("/api/v1/inventory/{inventory_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(json, serde_json::Value::Null);

    let (status, json) = common::get_json(
        common::build_test_app(state),
        &format!("/api/v1/inventory/{inventory_id}"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "aggregate_not_found");
}

#[tokio::test]
async fn test_inventory_add_item_to_unknown_inventory_returns_404() {
    let app = common::build_test_app(common::in_memory_state());

    let (status, _) = common::post_json(
        app,
        &format!("/api/v1/inventory/{}/items", Uuid::new_v4()),
        &serde_json::json!({ "item_id": Uuid::new_v4() }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inventory_duplicate_item_returns_400() {
    let state = common::in_memory_state();
    let inventory_id = common::create_inventory(&state).await;
    let uri = format!("/api/v1/inventory/{inventory_id}/items");
    let body = serde_json::json!({ "item_id": Uuid::new_v4() });
    common::post_json(common::build_test_app(state.clone()), &uri, &body).await;

    let (status, json) = common::post_json(common::build_test_app(state), &uri, &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_inventory_round_trip_on_postgres(pool: PgPool) {
    let state = common::pg_state(pool);
    let inventory_id = common::create_inventory(&state).await;
    let item_id = Uuid::new_v4();

    let (status, _) = common::post_json(
        common::build_test_app(state.clone()),
        &format!("/api/v1/inventory/{inventory_id}/items"),
        &serde_json::json!({ "item_id": item_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = common::get_json(
        common::build_test_app(state),
        &format!("/api/v1/inventory/{inventory_id}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["items"], serde_json::json!([item_id]));
    assert_eq!(json["version"], 2);
}

//! Routes for the inventory context.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use snapvault_inventory::application::command_handlers::{self, InventoryCommandResult};
use snapvault_inventory::application::query_handlers::{self, InventoryView};
use snapvault_inventory::domain::commands;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /{id}/items and POST /{id}/equip.
#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    /// The item to add or equip.
    pub item_id: Uuid,
}

/// Response body returned after a command is successfully handled.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// The inventory the command applied to.
    pub aggregate_id: Uuid,
    /// Inventory version after the save.
    pub version: i64,
    /// IDs of the domain events produced and published.
    pub event_ids: Vec<Uuid>,
}

impl From<InventoryCommandResult> for CommandResponse {
    fn from(result: InventoryCommandResult) -> Self {
        Self {
            aggregate_id: result.aggregate_id,
            version: result.version,
            event_ids: result
                .events
                .iter()
                .map(|event| event.metadata.event_id)
                .collect(),
        }
    }
}

/// POST /
#[instrument(skip(state))]
async fn create_inventory(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let command = commands::CreateInventory {
        correlation_id: Uuid::new_v4(),
    };

    info!(correlation_id = %command.correlation_id, "handling create_inventory command");

    let result = command_handlers::handle_create_inventory(
        &command,
        state.clock.as_ref(),
        &state.inventory,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(result.into())))
}

/// GET /{id}
#[instrument(skip(state))]
async fn get_inventory(
    State(state): State<AppState>,
    Path(inventory_id): Path<Uuid>,
) -> Result<Json<InventoryView>, ApiError> {
    let view = query_handlers::get_inventory_by_id(inventory_id, &state.inventory).await?;
    Ok(Json(view))
}

/// DELETE /{id}
#[instrument(skip(state))]
async fn delete_inventory(
    State(state): State<AppState>,
    Path(inventory_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = commands::DeleteInventory {
        correlation_id: Uuid::new_v4(),
        inventory_id,
    };

    info!(correlation_id = %command.correlation_id, "handling delete_inventory command");

    command_handlers::handle_delete_inventory(&command, &state.inventory).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /{id}/items
#[instrument(skip(state, request), fields(item_id = %request.item_id))]
async fn add_item(
    State(state): State<AppState>,
    Path(inventory_id): Path<Uuid>,
    Json(request): Json<ItemRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::AddItem {
        correlation_id: Uuid::new_v4(),
        inventory_id,
        item_id: request.item_id,
    };

    info!(correlation_id = %command.correlation_id, "handling add_item command");

    let result =
        command_handlers::handle_add_item(&command, state.clock.as_ref(), &state.inventory)
            .await?;

    Ok(Json(result.into()))
}

/// DELETE /{id}/items/{item_id}
#[instrument(skip(state))]
async fn remove_item(
    State(state): State<AppState>,
    Path((inventory_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::RemoveItem {
        correlation_id: Uuid::new_v4(),
        inventory_id,
        item_id,
    };

    info!(correlation_id = %command.correlation_id, "handling remove_item command");

    let result =
        command_handlers::handle_remove_item(&command, state.clock.as_ref(), &state.inventory)
            .await?;

    Ok(Json(result.into()))
}

/// POST /{id}/equip
#[instrument(skip(state, request), fields(item_id = %request.item_id))]
async fn equip_item(
    State(state): State<AppState>,
    Path(inventory_id): Path<Uuid>,
    Json(request): Json<ItemRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::EquipItem {
        correlation_id: Uuid::new_v4(),
        inventory_id,
        item_id: request.item_id,
    };

    info!(correlation_id = %command.correlation_id, "handling equip_item command");

    let result =
        command_handlers::handle_equip_item(&command, state.clock.as_ref(), &state.inventory)
            .await?;

    Ok(Json(result.into()))
}

/// Returns the router for the inventory context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_inventory))
        .route("/{id}", get(get_inventory).delete(delete_inventory))
        .route("/{id}/items", post(add_item))
        .route("/{id}/items/{item_id}", delete(remove_item))
        .route("/{id}/equip", post(equip_item))
}

//! Query handlers for the inventory context.
//!
//! Queries load the latest snapshot and return read-only view DTOs.

use serde::Serialize;
use snapvault_core::aggregate::AggregateRoot;
use snapvault_core::error::DomainError;
use snapvault_repository::AggregateRepository;
use uuid::Uuid;

use crate::application::command_handlers;
use crate::domain::aggregates::Inventory;

/// Read-only view of an inventory aggregate.
#[derive(Debug, Serialize)]
pub struct InventoryView {
    /// The inventory identifier.
    pub inventory_id: Uuid,
    /// Items currently in the inventory, in id order.
    pub items: Vec<Uuid>,
    /// The equipped item, if any.
    pub equipped: Option<Uuid>,
    /// Current version.
    pub version: i64,
}

impl From<&Inventory> for InventoryView {
    fn from(inventory: &Inventory) -> Self {
        Self {
            inventory_id: inventory.aggregate_id(),
            items: inventory.items().collect(),
            equipped: inventory.equipped(),
            version: inventory.version(),
        }
    }
}

/// Retrieves an inventory by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if nothing is stored under the
/// ID, or `DomainError::InvalidSnapshot` if the stored snapshot is unreadable.
pub async fn get_inventory_by_id(
    inventory_id: Uuid,
    repository: &AggregateRepository<Inventory>,
) -> Result<InventoryView, DomainError> {
    let inventory = command_handlers::load(repository, inventory_id).await?;
    Ok(InventoryView::from(&inventory))
}

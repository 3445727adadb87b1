//! Domain events for the inventory context.

use serde::{Deserialize, Serialize};
use snapvault_core::event::{DomainEvent, EventMetadata};
use uuid::Uuid;

/// Event type identifier for [`InventoryCreated`].
pub const INVENTORY_CREATED_EVENT_TYPE: &str = "inventory.created";
/// Event type identifier for [`ItemAdded`].
pub const ITEM_ADDED_EVENT_TYPE: &str = "inventory.item_added";
/// Event type identifier for [`ItemRemoved`].
pub const ITEM_REMOVED_EVENT_TYPE: &str = "inventory.item_removed";
/// Event type identifier for [`ItemEquipped`].
pub const ITEM_EQUIPPED_EVENT_TYPE: &str = "inventory.item_equipped";

/// Emitted when an inventory is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCreated {
    /// The inventory identifier.
    pub inventory_id: Uuid,
}

/// Emitted when an item is added to an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    /// The inventory identifier.
    pub inventory_id: Uuid,
    /// The item identifier.
    pub item_id: Uuid,
}

/// Emitted when an item is removed from an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    /// The inventory identifier.
    pub inventory_id: Uuid,
    /// The item identifier.
    pub item_id: Uuid,
    /// Whether the removed item was the equipped one.
    pub was_equipped: bool,
}

/// Emitted when an item is equipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEquipped {
    /// The inventory identifier.
    pub inventory_id: Uuid,
    /// The item identifier.
    pub item_id: Uuid,
}

/// Event payload variants for the inventory context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryEventKind {
    /// The inventory has been created.
    Created(InventoryCreated),
    /// An item has been added to the inventory.
    ItemAdded(ItemAdded),
    /// An item has been removed from the inventory.
    ItemRemoved(ItemRemoved),
    /// An item has been equipped.
    ItemEquipped(ItemEquipped),
}

/// Domain event envelope for the inventory context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: InventoryEventKind,
}

impl InventoryEventKind {
    /// The dotted event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => INVENTORY_CREATED_EVENT_TYPE,
            Self::ItemAdded(_) => ITEM_ADDED_EVENT_TYPE,
            Self::ItemRemoved(_) => ITEM_REMOVED_EVENT_TYPE,
            Self::ItemEquipped(_) => ITEM_EQUIPPED_EVENT_TYPE,
        }
    }
}

impl DomainEvent for InventoryEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Plain structs of ids and flags always serialize.
        serde_json::to_value(&self.kind).unwrap_or_default()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

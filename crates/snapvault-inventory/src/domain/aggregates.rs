//! Aggregate roots for the inventory context.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use snapvault_core::aggregate::AggregateRoot;
use snapvault_core::clock::Clock;
use snapvault_core::error::DomainError;
use snapvault_core::event::EventMetadata;
use snapvault_core::snapshot::Snapshot;
use uuid::Uuid;

use super::events::{
    InventoryCreated, InventoryEvent, InventoryEventKind, ItemAdded, ItemEquipped, ItemRemoved,
};

/// Aggregate type name recorded on inventory snapshots.
pub const INVENTORY_AGGREGATE_TYPE: &str = "inventory";

/// Persisted form of an inventory.
#[derive(Debug, Serialize, Deserialize)]
struct InventoryState {
    items: BTreeSet<Uuid>,
    equipped: Option<Uuid>,
}

/// The aggregate root for an inventory.
///
/// Every operation applies its event immediately, so reads after a command
/// see the new state before it is saved.
#[derive(Debug)]
pub struct Inventory {
    id: Uuid,
    version: i64,
    items: BTreeSet<Uuid>,
    equipped: Option<Uuid>,
    uncommitted_events: Vec<InventoryEvent>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(Uuid::new_v4())
    }
}

impl Inventory {
    /// Creates an empty, version-0 inventory.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            items: BTreeSet::new(),
            equipped: None,
            uncommitted_events: Vec::new(),
        }
    }

    /// Items currently held, in id order.
    pub fn items(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.items.iter().copied()
    }

    /// Whether `item_id` is held.
    #[must_use]
    pub fn contains(&self, item_id: Uuid) -> bool {
        self.items.contains(&item_id)
    }

    /// The equipped item, if any.
    #[must_use]
    pub fn equipped(&self) -> Option<Uuid> {
        self.equipped
    }

    /// Opens the inventory, producing an `InventoryCreated` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the inventory already exists.
    pub fn create(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        if self.version != 0 {
            return Err(DomainError::Validation(format!(
                "inventory {} already exists",
                self.id
            )));
        }
        self.raise(
            InventoryEventKind::Created(InventoryCreated {
                inventory_id: self.id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Adds an item to the inventory, producing an `ItemAdded` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the item is already held.
    pub fn add_item(
        &mut self,
        item_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.items.contains(&item_id) {
            return Err(DomainError::Validation(format!(
                "item {item_id} is already in inventory {}",
                self.id
            )));
        }
        self.raise(
            InventoryEventKind::ItemAdded(ItemAdded {
                inventory_id: self.id,
                item_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Removes an item from the inventory, producing an `ItemRemoved` event.
    /// Removing the equipped item also unequips it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the item is not in the inventory.
    pub fn remove_item(
        &mut self,
        item_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_held(item_id)?;
        self.raise(
            InventoryEventKind::ItemRemoved(ItemRemoved {
                inventory_id: self.id,
                item_id,
                was_equipped: self.equipped == Some(item_id),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Equips an item, producing an `ItemEquipped` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the item is not in the inventory.
    pub fn equip_item(
        &mut self,
        item_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_held(item_id)?;
        self.raise(
            InventoryEventKind::ItemEquipped(ItemEquipped {
                inventory_id: self.id,
                item_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    fn ensure_held(&self, item_id: Uuid) -> Result<(), DomainError> {
        if self.items.contains(&item_id) {
            Ok(())
        } else {
            Err(DomainError::Validation(format!(
                "item {item_id} not found in inventory {}",
                self.id
            )))
        }
    }

    fn raise(&mut self, kind: InventoryEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let event = InventoryEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.id,
                sequence_number: self.version + 1,
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        self.apply(&event.kind);
        self.version = event.metadata.sequence_number;
        self.uncommitted_events.push(event);
    }

    fn apply(&mut self, kind: &InventoryEventKind) {
        match kind {
            InventoryEventKind::Created(_) => {}
            InventoryEventKind::ItemAdded(payload) => {
                self.items.insert(payload.item_id);
            }
            InventoryEventKind::ItemRemoved(payload) => {
                self.items.remove(&payload.item_id);
                if payload.was_equipped {
                    self.equipped = None;
                }
            }
            InventoryEventKind::ItemEquipped(payload) => {
                self.equipped = Some(payload.item_id);
            }
        }
    }
}

impl AggregateRoot for Inventory {
    type Event = InventoryEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn commit(&mut self) {
        self.uncommitted_events.clear();
    }

    fn to_snapshot(&self) -> Result<Snapshot, DomainError> {
        let state = InventoryState {
            items: self.items.clone(),
            equipped: self.equipped,
        };
        let taken_at = self
            .uncommitted_events
            .last()
            .map_or_else(chrono::Utc::now, |event| event.metadata.occurred_at);
        Snapshot::from_state(
            self.id,
            INVENTORY_AGGREGATE_TYPE,
            self.version,
            &state,
            taken_at,
        )
    }

    fn load_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), DomainError> {
        if snapshot.aggregate_type != INVENTORY_AGGREGATE_TYPE {
            return Err(DomainError::InvalidSnapshot(format!(
                "expected an {INVENTORY_AGGREGATE_TYPE} snapshot, got {}",
                snapshot.aggregate_type
            )));
        }
        let state: InventoryState = snapshot.decode()?;
        self.id = snapshot.aggregate_id;
        self.version = snapshot.version;
        self.items = state.items;
        self.equipped = state.equipped;
        self.uncommitted_events.clear();
        Ok(())
    }
}

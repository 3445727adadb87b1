//! Command handlers for the inventory context.
//!
//! Each handler loads the inventory from the repository, runs the domain
//! operation and saves the result. A save that loses a race surfaces as
//! `DomainError::ConcurrencyConflict`; the caller reloads and retries.

use snapvault_core::aggregate::AggregateRoot;
use snapvault_core::clock::Clock;
use snapvault_core::command::Command;
use snapvault_core::error::DomainError;
use snapvault_repository::AggregateRepository;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::aggregates::Inventory;
use crate::domain::commands::{AddItem, CreateInventory, DeleteInventory, EquipItem, RemoveItem};
use crate::domain::events::InventoryEvent;

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct InventoryCommandResult {
    /// The aggregate ID affected by the command.
    pub aggregate_id: Uuid,
    /// Version of the inventory after the save.
    pub version: i64,
    /// The events produced and published.
    pub events: Vec<InventoryEvent>,
}

pub(crate) async fn load(
    repository: &AggregateRepository<Inventory>,
    inventory_id: Uuid,
) -> Result<Inventory, DomainError> {
    repository
        .get_by_id(inventory_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(inventory_id))
}

async fn persist(
    repository: &AggregateRepository<Inventory>,
    mut inventory: Inventory,
) -> Result<InventoryCommandResult, DomainError> {
    let events = inventory.uncommitted_events().to_vec();
    repository.save(&mut inventory).await?;
    Ok(InventoryCommandResult {
        aggregate_id: inventory.aggregate_id(),
        version: inventory.version(),
        events,
    })
}

/// Handles the `CreateInventory` command: opens a fresh inventory under a
/// new id and saves it.
///
/// # Errors
///
/// Returns `DomainError` if the save fails.
#[instrument(skip_all, fields(command = command.command_type()))]
pub async fn handle_create_inventory(
    command: &CreateInventory,
    clock: &dyn Clock,
    repository: &AggregateRepository<Inventory>,
) -> Result<InventoryCommandResult, DomainError> {
    let mut inventory = repository.new_aggregate();
    inventory.create(command.correlation_id, clock)?;
    let result = persist(repository, inventory).await?;
    debug!(inventory_id = %result.aggregate_id, "inventory created");
    Ok(result)
}

/// Handles the `AddItem` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the inventory does not exist,
/// `DomainError::Validation` if the item is already held, or any error from
/// the save.
#[instrument(skip_all, fields(command = command.command_type(), inventory_id = %command.inventory_id))]
pub async fn handle_add_item(
    command: &AddItem,
    clock: &dyn Clock,
    repository: &AggregateRepository<Inventory>,
) -> Result<InventoryCommandResult, DomainError> {
    let mut inventory = load(repository, command.inventory_id).await?;
    inventory.add_item(command.item_id, command.correlation_id, clock)?;
    persist(repository, inventory).await
}

/// Handles the `RemoveItem` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the inventory does not exist,
/// `DomainError::Validation` if the item is not held, or any error from the
/// save.
#[instrument(skip_all, fields(command = command.command_type(), inventory_id = %command.inventory_id))]
pub async fn handle_remove_item(
    command: &RemoveItem,
    clock: &dyn Clock,
    repository: &AggregateRepository<Inventory>,
) -> Result<InventoryCommandResult, DomainError> {
    let mut inventory = load(repository, command.inventory_id).await?;
    inventory.remove_item(command.item_id, command.correlation_id, clock)?;
    persist(repository, inventory).await
}

/// Handles the `EquipItem` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the inventory does not exist,
/// `DomainError::Validation` if the item is not held, or any error from the
/// save.
#[instrument(skip_all, fields(command = command.command_type(), inventory_id = %command.inventory_id))]
pub async fn handle_equip_item(
    command: &EquipItem,
    clock: &dyn Clock,
    repository: &AggregateRepository<Inventory>,
) -> Result<InventoryCommandResult, DomainError> {
    let mut inventory = load(repository, command.inventory_id).await?;
    inventory.equip_item(command.item_id, command.correlation_id, clock)?;
    persist(repository, inventory).await
}

/// Handles the `DeleteInventory` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the inventory does not exist,
/// or any error from the backends.
#[instrument(skip_all, fields(command = command.command_type(), inventory_id = %command.inventory_id))]
pub async fn handle_delete_inventory(
    command: &DeleteInventory,
    repository: &AggregateRepository<Inventory>,
) -> Result<(), DomainError> {
    let inventory = load(repository, command.inventory_id).await?;
    repository.delete(&inventory).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use snapvault_core::event::DomainEvent;
    use snapvault_store::{InMemoryManifest, InMemorySnapshotStore};
    use snapvault_test_support::{FailingSnapshotStore, FixedClock, RecordingEventPublisher};

    use super::*;
    use crate::domain::events::{
        INVENTORY_CREATED_EVENT_TYPE, ITEM_ADDED_EVENT_TYPE, InventoryEventKind,
    };

    struct Fixture {
        repository: AggregateRepository<Inventory>,
        publisher: Arc<RecordingEventPublisher<InventoryEvent>>,
        clock: FixedClock,
    }

    fn fixture() -> Fixture {
        let publisher = Arc::new(RecordingEventPublisher::<InventoryEvent>::new());
        let repository =
            AggregateRepository::<Inventory>::with_default(Arc::new(InMemorySnapshotStore::new()))
                .with_manifest(Arc::new(InMemoryManifest::new()))
                .with_publisher(publisher.clone());
        Fixture {
            repository,
            publisher,
            clock: FixedClock::default(),
        }
    }

    async fn create(fx: &Fixture) -> Uuid {
        let command = CreateInventory {
            correlation_id: Uuid::new_v4(),
        };
        handle_create_inventory(&command, &fx.clock, &fx.repository)
            .await
            .unwrap()
            .aggregate_id
    }

    #[tokio::test]
    async fn test_handle_create_inventory_saves_version_one() {
        // Arrange
        let fx = fixture();
        let command = CreateInventory {
            correlation_id: Uuid::new_v4(),
        };

        // Act
        let result = handle_create_inventory(&command, &fx.clock, &fx.repository)
            .await
            .unwrap();

        // Assert
        assert_eq!(result.version, 1);
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].event_type(), INVENTORY_CREATED_EVENT_TYPE);
        assert_eq!(
            result.events[0].metadata().correlation_id,
            command.correlation_id
        );
        let stored = fx.repository.get_by_id(result.aggregate_id).await.unwrap();
        assert_eq!(stored.unwrap().version(), 1);
        assert_eq!(fx.publisher.published().len(), 1);
    }

    #[tokio::test]
    async fn test_handle_add_item_persists_and_publishes() {
        // Arrange
        let fx = fixture();
        let inventory_id = create(&fx).await;
        let item_id = Uuid::new_v4();
        let command = AddItem {
            correlation_id: Uuid::new_v4(),
            inventory_id,
            item_id,
        };

        // Act
        let result = handle_add_item(&command, &fx.clock, &fx.repository)
            .await
            .unwrap();

        // Assert
        assert_eq!(result.aggregate_id, inventory_id);
        assert_eq!(result.version, 2);
        let published = fx.publisher.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[1].event_type(), ITEM_ADDED_EVENT_TYPE);
        match &published[1].kind {
            InventoryEventKind::ItemAdded(payload) => assert_eq!(payload.item_id, item_id),
            other => panic!("expected ItemAdded, got {other:?}"),
        }
        let stored = fx.repository.get_by_id(inventory_id).await.unwrap().unwrap();
        assert!(stored.contains(item_id));
    }

    #[tokio::test]
    async fn test_handle_add_item_returns_not_found_for_unknown_inventory() {
        // Arrange
        let fx = fixture();
        let inventory_id = Uuid::new_v4();
        let command = AddItem {
            correlation_id: Uuid::new_v4(),
            inventory_id,
            item_id: Uuid::new_v4(),
        };

        // Act
        let result = handle_add_item(&command, &fx.clock, &fx.repository).await;

        // Assert
        match result.unwrap_err() {
            DomainError::AggregateNotFound(id) => assert_eq!(id, inventory_id),
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
        assert!(fx.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_handle_remove_item_returns_validation_error_for_missing_item() {
        let fx = fixture();
        let inventory_id = create(&fx).await;
        let command = RemoveItem {
            correlation_id: Uuid::new_v4(),
            inventory_id,
            item_id: Uuid::new_v4(),
        };

        let result = handle_remove_item(&command, &fx.clock, &fx.repository).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(fx.publisher.published().len(), 1);
    }

    #[tokio::test]
    async fn test_handle_equip_then_remove_item_round_trip() {
        // Arrange
        let fx = fixture();
        let inventory_id = create(&fx).await;
        let item_id = Uuid::new_v4();
        let add = AddItem {
            correlation_id: Uuid::new_v4(),
            inventory_id,
            item_id,
        };
        handle_add_item(&add, &fx.clock, &fx.repository).await.unwrap();

        // Act
        let equip = EquipItem {
            correlation_id: Uuid::new_v4(),
            inventory_id,
            item_id,
        };
        handle_equip_item(&equip, &fx.clock, &fx.repository)
            .await
            .unwrap();
        let remove = RemoveItem {
            correlation_id: Uuid::new_v4(),
            inventory_id,
            item_id,
        };
        let result = handle_remove_item(&remove, &fx.clock, &fx.repository)
            .await
            .unwrap();

        // Assert
        assert_eq!(result.version, 4);
        let stored = fx.repository.get_by_id(inventory_id).await.unwrap().unwrap();
        assert!(!stored.contains(item_id));
        assert_eq!(stored.equipped(), None);
    }

    #[tokio::test]
    async fn test_stale_copy_loses_to_concurrent_writer() {
        // Arrange
        let fx = fixture();
        let inventory_id = create(&fx).await;
        let mut first = load(&fx.repository, inventory_id).await.unwrap();
        let mut second = load(&fx.repository, inventory_id).await.unwrap();
        first
            .add_item(Uuid::new_v4(), Uuid::new_v4(), &fx.clock)
            .unwrap();
        second
            .add_item(Uuid::new_v4(), Uuid::new_v4(), &fx.clock)
            .unwrap();
        fx.repository.save(&mut first).await.unwrap();

        // Act
        let result = fx.repository.save(&mut second).await;

        // Assert
        match result.unwrap_err() {
            DomainError::ConcurrencyConflict {
                expected, actual, ..
            } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
        assert_eq!(second.uncommitted_events().len(), 1);
    }

    #[tokio::test]
    async fn test_handle_delete_inventory_removes_it() {
        // Arrange
        let fx = fixture();
        let inventory_id = create(&fx).await;
        let command = DeleteInventory {
            correlation_id: Uuid::new_v4(),
            inventory_id,
        };

        // Act
        handle_delete_inventory(&command, &fx.repository)
            .await
            .unwrap();

        // Assert
        assert!(
            fx.repository
                .get_by_id(inventory_id)
                .await
                .unwrap()
                .is_none()
        );
        let again = handle_delete_inventory(&command, &fx.repository).await;
        assert!(matches!(again, Err(DomainError::AggregateNotFound(_))));
    }

    #[tokio::test]
    async fn test_store_failure_propagates_and_publishes_nothing() {
        // Arrange
        let publisher = Arc::new(RecordingEventPublisher::<InventoryEvent>::new());
        let repository =
            AggregateRepository::<Inventory>::with_default(Arc::new(FailingSnapshotStore::new()))
                .with_publisher(publisher.clone());
        let command = CreateInventory {
            correlation_id: Uuid::new_v4(),
        };

        // Act
        let result =
            handle_create_inventory(&command, &FixedClock::default(), &repository).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Store(_))));
        assert!(publisher.published().is_empty());
    }
}

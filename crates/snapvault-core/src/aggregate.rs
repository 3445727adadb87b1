//! Aggregate root abstraction.

use uuid::Uuid;

use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::snapshot::Snapshot;

/// Trait for aggregate roots persisted as snapshots.
///
/// Raising an event applies it immediately, so `version()` already counts
/// every uncommitted event. The first uncommitted event's version minus one
/// is therefore the version the aggregate was loaded at.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version, including uncommitted events.
    fn version(&self) -> i64;

    /// Returns uncommitted events in the order they were raised.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Clears uncommitted events once they are durable.
    fn commit(&mut self);

    /// Captures the full current state. Uncommitted events are not part of a
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidSnapshot` if state cannot be serialized.
    fn to_snapshot(&self) -> Result<Snapshot, DomainError>;

    /// Replaces state with the content of `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidSnapshot` if the payload cannot be read.
    fn load_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), DomainError>;

    /// The version this aggregate was loaded at, derived from its first
    /// uncommitted event. `None` when there is nothing to persist.
    fn expected_version(&self) -> Option<i64> {
        self.uncommitted_events()
            .first()
            .map(|event| event.version() - 1)
    }
}

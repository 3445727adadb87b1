//! Snapshot store port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;
use crate::snapshot::Snapshot;

/// Key-value persistence of snapshots, keyed by aggregate identity.
///
/// Writes are conditional on the version currently stored, with an absent
/// snapshot counting as version 0. Implementations perform each check and
/// write as one atomic step, so of two writers replacing the same version
/// only one succeeds.
///
/// Implementations report backend failures as `DomainError::Store`; the
/// repository propagates those errors unchanged and never retries them.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Loads the snapshot for `aggregate_id`, or `None` if nothing is stored.
    async fn get(&self, aggregate_id: Uuid) -> Result<Option<Snapshot>, DomainError>;

    /// Stores `snapshot` if the stored snapshot for the same aggregate is at
    /// `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` and writes nothing if the
    /// stored version differs.
    async fn save(&self, snapshot: &Snapshot, expected_version: i64) -> Result<(), DomainError>;

    /// Removes the snapshot for `aggregate_id` only if it is at `version`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` and removes nothing if the
    /// stored version differs.
    async fn discard(&self, aggregate_id: Uuid, version: i64) -> Result<(), DomainError>;

    /// Removes the snapshot for `aggregate_id`. Removing an absent snapshot
    /// succeeds.
    async fn delete_by_id(&self, aggregate_id: Uuid) -> Result<(), DomainError>;

    /// Releases connections or handles held by the store.
    async fn dispose(&self) -> Result<(), DomainError>;
}

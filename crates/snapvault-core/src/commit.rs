//! Transactional snapshot commit port.
//!
//! Backends that keep snapshots and manifest entries in one database can
//! write both in a single transaction. A repository given a committer uses
//! it instead of writing the store and the manifest one after the other.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;
use crate::snapshot::Snapshot;

/// Writes a snapshot and its manifest entry together, or neither.
#[async_trait]
pub trait SnapshotCommitter: Send + Sync {
    /// Stores `snapshot` and moves its aggregate's manifest entry from
    /// `expected_version` to `snapshot.version`.
    ///
    /// The recorded version is the manifest entry's, or the stored
    /// snapshot's when the aggregate has no entry, or 0.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` and writes nothing if the
    /// recorded version is not `expected_version`, or `DomainError::Store` on
    /// backend failure.
    async fn commit(&self, snapshot: &Snapshot, expected_version: i64) -> Result<(), DomainError>;

    /// Removes the snapshot and manifest entry for `aggregate_id` together.
    async fn remove(&self, aggregate_id: Uuid) -> Result<(), DomainError>;
}

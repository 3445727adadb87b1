//! Aggregate manifest port.
//!
//! The manifest is a side index of aggregate id to last committed version. It
//! lets the repository check versions without loading a full snapshot, and it
//! is the seam where multi-writer safety is enforced: `update_manifest` must
//! be a single compare-and-set in the backing store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// One manifest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// The aggregate this entry describes.
    pub aggregate_id: Uuid,
    /// Version of the most recently committed snapshot.
    pub version: i64,
    /// When the entry was last written.
    pub updated_at: DateTime<Utc>,
}

/// Authoritative record of each aggregate's last committed version.
#[async_trait]
pub trait AggregateManifest: Send + Sync {
    /// Records `new_version` for `aggregate_id`.
    ///
    /// When an entry exists it is only replaced if its version equals
    /// `expected_prior_version`. When no entry exists one is created; of two
    /// concurrent creators only one succeeds.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if another writer advanced
    /// the entry first, or `DomainError::Manifest` on backend failure.
    async fn update_manifest(
        &self,
        aggregate_id: Uuid,
        expected_prior_version: i64,
        new_version: i64,
    ) -> Result<(), DomainError>;

    /// Returns the recorded version, or `None` if the aggregate has no entry.
    async fn get_version(&self, aggregate_id: Uuid) -> Result<Option<i64>, DomainError>;

    /// Removes the entry for `aggregate_id`. Removing an absent entry
    /// succeeds.
    async fn remove(&self, aggregate_id: Uuid) -> Result<(), DomainError>;
}

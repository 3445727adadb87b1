//! In-memory snapshot store and manifest.
//!
//! Both are safe to share between tasks. Snapshot writes and manifest updates
//! each perform their compare-and-set under a single write lock, so they give
//! the same multi-writer guarantee as the PostgreSQL backends within one
//! process.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use snapvault_core::clock::{Clock, SystemClock};
use snapvault_core::error::DomainError;
use snapvault_core::manifest::{AggregateManifest, ManifestEntry};
use snapvault_core::snapshot::Snapshot;
use snapvault_core::store::SnapshotStore;
use tokio::sync::RwLock;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::StoreError;

/// Snapshot store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<Uuid, Snapshot>>,
    disposed: AtomicBool,
}

impl InMemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(DomainError::store(StoreError::Disposed));
        }
        Ok(())
    }
}

fn check_version(
    snapshots: &HashMap<Uuid, Snapshot>,
    aggregate_id: Uuid,
    expected: i64,
) -> Result<(), DomainError> {
    let actual = snapshots
        .get(&aggregate_id)
        .map_or(0, |snapshot| snapshot.version);
    if actual == expected {
        Ok(())
    } else {
        Err(DomainError::ConcurrencyConflict {
            aggregate_id,
            expected,
            actual,
        })
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn get(&self, aggregate_id: Uuid) -> Result<Option<Snapshot>, DomainError> {
        self.ensure_open()?;
        let snapshot = self.snapshots.read().await.get(&aggregate_id).cloned();
        trace!(%aggregate_id, found = snapshot.is_some(), "snapshot lookup");
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &Snapshot, expected_version: i64) -> Result<(), DomainError> {
        self.ensure_open()?;
        let mut snapshots = self.snapshots.write().await;
        check_version(&snapshots, snapshot.aggregate_id, expected_version)?;
        snapshots.insert(snapshot.aggregate_id, snapshot.clone());
        trace!(
            aggregate_id = %snapshot.aggregate_id,
            version = snapshot.version,
            "snapshot stored"
        );
        Ok(())
    }

    async fn discard(&self, aggregate_id: Uuid, version: i64) -> Result<(), DomainError> {
        self.ensure_open()?;
        let mut snapshots = self.snapshots.write().await;
        check_version(&snapshots, aggregate_id, version)?;
        snapshots.remove(&aggregate_id);
        trace!(%aggregate_id, version, "snapshot discarded");
        Ok(())
    }

    async fn delete_by_id(&self, aggregate_id: Uuid) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.snapshots.write().await.remove(&aggregate_id);
        Ok(())
    }

    async fn dispose(&self) -> Result<(), DomainError> {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.snapshots.write().await.clear();
            debug!("in-memory snapshot store disposed");
        }
        Ok(())
    }
}

/// Manifest backed by a `HashMap`, with compare-and-set updates.
pub struct InMemoryManifest {
    entries: RwLock<HashMap<Uuid, ManifestEntry>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InMemoryManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryManifest")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryManifest {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl InMemoryManifest {
    /// Creates an empty manifest stamped with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty manifest stamped with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the full entry for `aggregate_id`.
    pub async fn entry(&self, aggregate_id: Uuid) -> Option<ManifestEntry> {
        self.entries.read().await.get(&aggregate_id).cloned()
    }
}

#[async_trait]
impl AggregateManifest for InMemoryManifest {
    async fn update_manifest(
        &self,
        aggregate_id: Uuid,
        expected_prior_version: i64,
        new_version: i64,
    ) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(&aggregate_id) {
            if entry.version != expected_prior_version {
                return Err(DomainError::ConcurrencyConflict {
                    aggregate_id,
                    expected: expected_prior_version,
                    actual: entry.version,
                });
            }
        }
        entries.insert(
            aggregate_id,
            ManifestEntry {
                aggregate_id,
                version: new_version,
                updated_at: self.clock.now(),
            },
        );
        Ok(())
    }

    async fn get_version(&self, aggregate_id: Uuid) -> Result<Option<i64>, DomainError> {
        Ok(self
            .entries
            .read()
            .await
            .get(&aggregate_id)
            .map(|entry| entry.version))
    }

    async fn remove(&self, aggregate_id: Uuid) -> Result<(), DomainError> {
        self.entries.write().await.remove(&aggregate_id);
        Ok(())
    }
}

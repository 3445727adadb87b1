//! Test snapshot stores — mock `SnapshotStore` implementations for tests.

use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

use async_trait::async_trait;
use snapvault_core::error::DomainError;
use snapvault_core::snapshot::Snapshot;
use snapvault_core::store::SnapshotStore;
use uuid::Uuid;

use crate::call_log::{Call, CallLog};

/// A working in-memory snapshot store with version-checked writes that
/// records every call in a [`CallLog`].
#[derive(Debug, Default)]
pub struct RecordingSnapshotStore {
    snapshots: Mutex<HashMap<Uuid, Snapshot>>,
    log: CallLog,
}

impl RecordingSnapshotStore {
    /// Creates an empty store with its own log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that records into `log`.
    #[must_use]
    pub fn with_log(log: CallLog) -> Self {
        Self {
            snapshots: Mutex::default(),
            log,
        }
    }

    /// Stores `snapshot` directly, without recording a call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, snapshot: Snapshot) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(snapshot.aggregate_id, snapshot);
    }

    /// Returns the stored snapshot for `aggregate_id` without recording a
    /// call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn stored(&self, aggregate_id: Uuid) -> Option<Snapshot> {
        self.snapshots.lock().unwrap().get(&aggregate_id).cloned()
    }

    /// The log this store records into.
    #[must_use]
    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

fn stored_version(snapshots: &HashMap<Uuid, Snapshot>, aggregate_id: Uuid) -> i64 {
    snapshots
        .get(&aggregate_id)
        .map_or(0, |snapshot| snapshot.version)
}

#[async_trait]
impl SnapshotStore for RecordingSnapshotStore {
    async fn get(&self, aggregate_id: Uuid) -> Result<Option<Snapshot>, DomainError> {
        self.log.record(Call::StoreGet(aggregate_id));
        Ok(self.stored(aggregate_id))
    }

    async fn save(&self, snapshot: &Snapshot, expected_version: i64) -> Result<(), DomainError> {
        self.log.record(Call::StoreSave {
            aggregate_id: snapshot.aggregate_id,
            version: snapshot.version,
        });
        let mut snapshots = self.snapshots.lock().unwrap();
        let actual = stored_version(&snapshots, snapshot.aggregate_id);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: snapshot.aggregate_id,
                expected: expected_version,
                actual,
            });
        }
        snapshots.insert(snapshot.aggregate_id, snapshot.clone());
        Ok(())
    }

    async fn discard(&self, aggregate_id: Uuid, version: i64) -> Result<(), DomainError> {
        self.log.record(Call::StoreDiscard {
            aggregate_id,
            version,
        });
        let mut snapshots = self.snapshots.lock().unwrap();
        let actual = stored_version(&snapshots, aggregate_id);
        if actual != version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: version,
                actual,
            });
        }
        snapshots.remove(&aggregate_id);
        Ok(())
    }

    async fn delete_by_id(&self, aggregate_id: Uuid) -> Result<(), DomainError> {
        self.log.record(Call::StoreDelete(aggregate_id));
        self.snapshots.lock().unwrap().remove(&aggregate_id);
        Ok(())
    }

    async fn dispose(&self) -> Result<(), DomainError> {
        self.log.record(Call::StoreDispose);
        Ok(())
    }
}

/// A snapshot store whose writes always fail. Reads return the optional seed
/// snapshot so the version check can pass before the failing write.
#[derive(Debug, Default)]
pub struct FailingSnapshotStore {
    existing: Option<Snapshot>,
    log: CallLog,
}

impl FailingSnapshotStore {
    /// Creates a store with nothing stored.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that records into `log` and returns `existing` from
    /// every read.
    #[must_use]
    pub fn with_log(log: CallLog, existing: Option<Snapshot>) -> Self {
        Self { existing, log }
    }

    fn failure() -> DomainError {
        DomainError::store(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        ))
    }
}

#[async_trait]
impl SnapshotStore for FailingSnapshotStore {
    async fn get(&self, aggregate_id: Uuid) -> Result<Option<Snapshot>, DomainError> {
        self.log.record(Call::StoreGet(aggregate_id));
        Ok(self.existing.clone())
    }

    async fn save(&self, snapshot: &Snapshot, _expected_version: i64) -> Result<(), DomainError> {
        self.log.record(Call::StoreSave {
            aggregate_id: snapshot.aggregate_id,
            version: snapshot.version,
        });
        Err(Self::failure())
    }

    async fn discard(&self, aggregate_id: Uuid, version: i64) -> Result<(), DomainError> {
        self.log.record(Call::StoreDiscard {
            aggregate_id,
            version,
        });
        Err(Self::failure())
    }

    async fn delete_by_id(&self, aggregate_id: Uuid) -> Result<(), DomainError> {
        self.log.record(Call::StoreDelete(aggregate_id));
        Err(Self::failure())
    }

    async fn dispose(&self) -> Result<(), DomainError> {
        self.log.record(Call::StoreDispose);
        Ok(())
    }
}

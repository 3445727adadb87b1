//! Test manifests — mock `AggregateManifest` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use snapvault_core::error::DomainError;
use snapvault_core::manifest::AggregateManifest;
use uuid::Uuid;

use crate::call_log::{Call, CallLog};

/// A working in-memory manifest with compare-and-set semantics that records
/// every call in a [`CallLog`].
#[derive(Debug, Default)]
pub struct RecordingManifest {
    versions: Mutex<HashMap<Uuid, i64>>,
    log: CallLog,
}

impl RecordingManifest {
    /// Creates an empty manifest with its own log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty manifest that records into `log`.
    #[must_use]
    pub fn with_log(log: CallLog) -> Self {
        Self {
            versions: Mutex::default(),
            log,
        }
    }

    /// Sets the recorded version directly, without recording a call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, aggregate_id: Uuid, version: i64) {
        self.versions.lock().unwrap().insert(aggregate_id, version);
    }

    /// Returns the recorded version without recording a call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn recorded(&self, aggregate_id: Uuid) -> Option<i64> {
        self.versions.lock().unwrap().get(&aggregate_id).copied()
    }

    /// The log this manifest records into.
    #[must_use]
    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

#[async_trait]
impl AggregateManifest for RecordingManifest {
    async fn update_manifest(
        &self,
        aggregate_id: Uuid,
        expected_prior_version: i64,
        new_version: i64,
    ) -> Result<(), DomainError> {
        self.log.record(Call::ManifestUpdate {
            aggregate_id,
            expected: expected_prior_version,
            new: new_version,
        });
        let mut versions = self.versions.lock().unwrap();
        match versions.get(&aggregate_id) {
            Some(&actual) if actual != expected_prior_version => {
                Err(DomainError::ConcurrencyConflict {
                    aggregate_id,
                    expected: expected_prior_version,
                    actual,
                })
            }
            _ => {
                versions.insert(aggregate_id, new_version);
                Ok(())
            }
        }
    }

    async fn get_version(&self, aggregate_id: Uuid) -> Result<Option<i64>, DomainError> {
        self.log.record(Call::ManifestGetVersion(aggregate_id));
        Ok(self.recorded(aggregate_id))
    }

    async fn remove(&self, aggregate_id: Uuid) -> Result<(), DomainError> {
        self.log.record(Call::ManifestRemove(aggregate_id));
        self.versions.lock().unwrap().remove(&aggregate_id);
        Ok(())
    }
}

/// A manifest that reports no entries and fails every update.
#[derive(Debug, Default)]
pub struct FailingManifest {
    log: CallLog,
}

impl FailingManifest {
    /// Creates a failing manifest that records into `log`.
    #[must_use]
    pub fn with_log(log: CallLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl AggregateManifest for FailingManifest {
    async fn update_manifest(
        &self,
        aggregate_id: Uuid,
        expected_prior_version: i64,
        new_version: i64,
    ) -> Result<(), DomainError> {
        self.log.record(Call::ManifestUpdate {
            aggregate_id,
            expected: expected_prior_version,
            new: new_version,
        });
        Err(DomainError::manifest("manifest table unavailable"))
    }

    async fn get_version(&self, aggregate_id: Uuid) -> Result<Option<i64>, DomainError> {
        self.log.record(Call::ManifestGetVersion(aggregate_id));
        Ok(None)
    }

    async fn remove(&self, aggregate_id: Uuid) -> Result<(), DomainError> {
        self.log.record(Call::ManifestRemove(aggregate_id));
        Err(DomainError::manifest("manifest table unavailable"))
    }
}

/// A working manifest that can be told to fail its next update.
#[derive(Debug, Default)]
pub struct FlakyManifest {
    inner: RecordingManifest,
    fail_next: AtomicBool,
}

impl FlakyManifest {
    /// Creates an empty manifest that records into `log`.
    #[must_use]
    pub fn with_log(log: CallLog) -> Self {
        Self {
            inner: RecordingManifest::with_log(log),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Makes the next `update_manifest` call fail without changing anything.
    pub fn fail_next_update(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Returns the recorded version without recording a call.
    #[must_use]
    pub fn recorded(&self, aggregate_id: Uuid) -> Option<i64> {
        self.inner.recorded(aggregate_id)
    }
}

#[async_trait]
impl AggregateManifest for FlakyManifest {
    async fn update_manifest(
        &self,
        aggregate_id: Uuid,
        expected_prior_version: i64,
        new_version: i64,
    ) -> Result<(), DomainError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            self.inner.log().record(Call::ManifestUpdate {
                aggregate_id,
                expected: expected_prior_version,
                new: new_version,
            });
            return Err(DomainError::manifest("manifest write timed out"));
        }
        self.inner
            .update_manifest(aggregate_id, expected_prior_version, new_version)
            .await
    }

    async fn get_version(&self, aggregate_id: Uuid) -> Result<Option<i64>, DomainError> {
        self.inner.get_version(aggregate_id).await
    }

    async fn remove(&self, aggregate_id: Uuid) -> Result<(), DomainError> {
        self.inner.remove(aggregate_id).await
    }
}

//! Ordered record of collaborator calls, shared between test doubles.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

/// A single observed collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `SnapshotStore::get`.
    StoreGet(Uuid),
    /// `SnapshotStore::save`.
    StoreSave {
        /// Aggregate whose snapshot was written.
        aggregate_id: Uuid,
        /// Version of the written snapshot.
        version: i64,
    },
    /// `SnapshotStore::discard`.
    StoreDiscard {
        /// Aggregate whose snapshot was discarded.
        aggregate_id: Uuid,
        /// Version the snapshot had to be at.
        version: i64,
    },
    /// `SnapshotStore::delete_by_id`.
    StoreDelete(Uuid),
    /// `SnapshotStore::dispose`.
    StoreDispose,
    /// `AggregateManifest::get_version`.
    ManifestGetVersion(Uuid),
    /// `AggregateManifest::update_manifest`.
    ManifestUpdate {
        /// Aggregate whose entry was updated.
        aggregate_id: Uuid,
        /// Prior version the writer expected.
        expected: i64,
        /// Version being recorded.
        new: i64,
    },
    /// `AggregateManifest::remove`.
    ManifestRemove(Uuid),
    /// `EventPublisher::publish`.
    Publish {
        /// Aggregate that raised the event.
        aggregate_id: Uuid,
        /// Version carried by the event.
        version: i64,
    },
}

impl Call {
    /// Returns `true` for calls that change stored or published state.
    #[must_use]
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::StoreGet(_) | Self::ManifestGetVersion(_))
    }
}

/// Cloneable handle to a shared, ordered call list.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `call`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn record(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    /// Returns every call recorded so far, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    /// Returns only the calls that change state.
    #[must_use]
    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    /// Forgets every recorded call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

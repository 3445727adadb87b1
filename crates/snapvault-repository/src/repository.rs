//! Snapshot-backed aggregate repository.
//!
//! A save runs a fixed sequence: version check, snapshot write, manifest
//! update, change notification, event publication, commit. Each step only
//! starts once the previous one succeeded, so a failed save leaves the
//! aggregate untouched and emits nothing.
//!
//! With a [`SnapshotCommitter`] the snapshot and manifest writes happen in
//! one backend transaction. Otherwise the snapshot write is conditional on the
//! stored version, and a failed manifest update puts the previous snapshot
//! back before the error is returned.

use std::fmt;
use std::sync::Arc;

use snapvault_core::aggregate::AggregateRoot;
use snapvault_core::commit::SnapshotCommitter;
use snapvault_core::error::DomainError;
use snapvault_core::manifest::AggregateManifest;
use snapvault_core::publisher::EventPublisher;
use snapvault_core::snapshot::Snapshot;
use snapvault_core::store::SnapshotStore;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

use crate::config::RepositoryConfig;
use crate::gate::WriteGate;
use crate::notifier::{ChangeNotification, ChangeNotifier, ChangeSubscription};

type Factory<A> = Box<dyn Fn() -> A + Send + Sync>;

/// Loads, saves and deletes aggregates of type `A` as snapshots.
///
/// The manifest is optional. Without one, the version check reads the stored
/// snapshot's own version.
pub struct AggregateRepository<A: AggregateRoot> {
    store: Arc<dyn SnapshotStore>,
    manifest: Option<Arc<dyn AggregateManifest>>,
    committer: Option<Arc<dyn SnapshotCommitter>>,
    publisher: Option<Arc<dyn EventPublisher<A::Event>>>,
    notifier: ChangeNotifier,
    gate: Option<WriteGate>,
    factory: Factory<A>,
}

impl<A> AggregateRepository<A>
where
    A: AggregateRoot + 'static,
{
    /// Creates a repository over `store` that builds fresh aggregates with
    /// `factory`.
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        factory: impl Fn() -> A + Send + Sync + 'static,
    ) -> Self {
        let config = RepositoryConfig::default();
        Self {
            store,
            manifest: None,
            committer: None,
            publisher: None,
            notifier: ChangeNotifier::new(config.notifier_capacity),
            gate: config.serialize_writes.then(WriteGate::default),
            factory: Box::new(factory),
        }
    }

    /// Uses `manifest` for version checks and records every save in it.
    #[must_use]
    pub fn with_manifest(mut self, manifest: Arc<dyn AggregateManifest>) -> Self {
        self.manifest = Some(manifest);
        self
    }

    /// Writes snapshots and manifest entries through `committer` in one
    /// transaction, and deletes them the same way.
    #[must_use]
    pub fn with_committer(mut self, committer: Arc<dyn SnapshotCommitter>) -> Self {
        self.committer = Some(committer);
        self
    }

    /// Publishes committed events through `publisher`.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher<A::Event>>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Applies `config`. This replaces the change notifier, so call it before
    /// handing out subscriptions.
    #[must_use]
    pub fn with_config(mut self, config: &RepositoryConfig) -> Self {
        self.notifier = ChangeNotifier::new(config.notifier_capacity);
        self.gate = config.serialize_writes.then(WriteGate::default);
        self
    }

    /// Returns a fresh, version-0 aggregate. No I/O.
    pub fn new_aggregate(&self) -> A {
        (self.factory)()
    }

    /// Loads the aggregate stored under `aggregate_id`.
    ///
    /// Returns `Ok(None)` when nothing is stored; absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Store` if the snapshot cannot be read, or
    /// `DomainError::InvalidSnapshot` if the aggregate cannot be rebuilt from
    /// it.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, aggregate_id: Uuid) -> Result<Option<A>, DomainError> {
        let Some(snapshot) = self.store.get(aggregate_id).await? else {
            trace!("no snapshot stored");
            return Ok(None);
        };
        let mut aggregate = self.new_aggregate();
        aggregate.load_from_snapshot(&snapshot)?;
        trace!(version = snapshot.version, "aggregate loaded from snapshot");
        Ok(Some(aggregate))
    }

    /// Bulk loading is left to query-side components.
    ///
    /// # Errors
    ///
    /// Always returns `DomainError::Unsupported`.
    #[allow(clippy::unused_self)]
    pub fn get_all(&self) -> Result<Vec<A>, DomainError> {
        Err(DomainError::Unsupported(
            "get_all: iterate aggregates through a read model instead",
        ))
    }

    /// Persists `aggregate` if it has uncommitted events.
    ///
    /// On success the aggregate's events have been published and its
    /// uncommitted buffer cleared. On any error the aggregate is unchanged and
    /// no notification or event has been emitted.
    ///
    /// # Errors
    ///
    /// - `DomainError::ConcurrencyConflict` if the aggregate was not derived
    ///   from the version currently on record; reload and retry.
    /// - `DomainError::InvalidSnapshot` if the aggregate's snapshot does not
    ///   match its events.
    /// - `DomainError::Store` / `DomainError::Manifest` from the backends,
    ///   unchanged.
    #[instrument(skip(self, aggregate), fields(aggregate_id = %aggregate.aggregate_id()))]
    pub async fn save(&self, aggregate: &mut A) -> Result<(), DomainError> {
        let Some(expected_version) = aggregate.expected_version() else {
            trace!("no uncommitted events; nothing to save");
            return Ok(());
        };
        let aggregate_id = aggregate.aggregate_id();
        let _guard = self.lock(aggregate_id).await;

        let actual_version = self.current_version(aggregate_id).await?.unwrap_or(0);
        if expected_version != actual_version {
            warn!(
                expected = expected_version,
                actual = actual_version,
                "stale aggregate rejected"
            );
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual: actual_version,
            });
        }

        let snapshot = aggregate.to_snapshot()?;
        let pending = i64::try_from(aggregate.uncommitted_events().len()).map_err(|_| {
            DomainError::InvalidSnapshot(format!(
                "too many uncommitted events on {aggregate_id}"
            ))
        })?;
        if snapshot.aggregate_id != aggregate_id || snapshot.version != expected_version + pending {
            return Err(DomainError::InvalidSnapshot(format!(
                "snapshot of {} at version {} does not follow version {expected_version} plus {pending} event(s) of {aggregate_id}",
                snapshot.aggregate_id, snapshot.version
            )));
        }

        match &self.committer {
            Some(committer) => committer.commit(&snapshot, expected_version).await?,
            None => self.write(&snapshot, expected_version).await?,
        }

        let new_version = snapshot.version;
        let reached = self.notifier.notify(ChangeNotification::new(snapshot));

        if let Some(publisher) = &self.publisher {
            for event in aggregate.uncommitted_events() {
                publisher.publish(event).await;
            }
        }
        aggregate.commit();

        debug!(
            from = expected_version,
            to = new_version,
            subscribers = reached,
            "aggregate saved"
        );
        Ok(())
    }

    /// Deletes `aggregate`'s snapshot and manifest entry. No version check.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Store` or `DomainError::Manifest` from the
    /// backends.
    pub async fn delete(&self, aggregate: &A) -> Result<(), DomainError> {
        self.delete_by_id(aggregate.aggregate_id()).await
    }

    /// Deletes the snapshot and manifest entry stored under `aggregate_id`.
    /// No version check; callers needing one must check before deleting.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Store` or `DomainError::Manifest` from the
    /// backends. If the snapshot delete fails the manifest is left alone.
    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, aggregate_id: Uuid) -> Result<(), DomainError> {
        let _guard = self.lock(aggregate_id).await;
        if let Some(committer) = &self.committer {
            committer.remove(aggregate_id).await?;
            info!("aggregate deleted");
            return Ok(());
        }
        self.store.delete_by_id(aggregate_id).await?;
        if let Some(manifest) = &self.manifest {
            manifest.remove(aggregate_id).await?;
        }
        info!("aggregate deleted");
        Ok(())
    }

    /// Subscribes to "snapshot persisted" notifications.
    pub fn changes(&self) -> ChangeSubscription {
        self.notifier.subscribe()
    }

    /// Closes the change stream, ending every live subscription, and releases
    /// the snapshot store.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Store` if the store fails to release its
    /// resources.
    pub async fn dispose(self) -> Result<(), DomainError> {
        self.notifier.close();
        self.store.dispose().await?;
        info!("repository disposed");
        Ok(())
    }

    async fn lock(&self, aggregate_id: Uuid) -> Option<OwnedMutexGuard<()>> {
        match &self.gate {
            Some(gate) => Some(gate.acquire(aggregate_id).await),
            None => None,
        }
    }

    /// Writes the snapshot, then the manifest entry. A manifest failure undoes
    /// the snapshot write so readers never see a version the manifest lacks.
    async fn write(&self, snapshot: &Snapshot, expected_version: i64) -> Result<(), DomainError> {
        let Some(manifest) = &self.manifest else {
            return self.store.save(snapshot, expected_version).await;
        };

        let previous = self.store.get(snapshot.aggregate_id).await?;
        let stored_version = previous.as_ref().map_or(0, |previous| previous.version);
        if stored_version != expected_version {
            warn!(
                expected = expected_version,
                actual = stored_version,
                "stored snapshot moved past the manifest"
            );
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: snapshot.aggregate_id,
                expected: expected_version,
                actual: stored_version,
            });
        }

        self.store.save(snapshot, expected_version).await?;
        if let Err(err) = manifest
            .update_manifest(snapshot.aggregate_id, expected_version, snapshot.version)
            .await
        {
            self.roll_back(snapshot, previous.as_ref()).await;
            return Err(err);
        }
        Ok(())
    }

    async fn roll_back(&self, written: &Snapshot, previous: Option<&Snapshot>) {
        let restored = match previous {
            Some(previous) => self.store.save(previous, written.version).await,
            None => {
                self.store
                    .discard(written.aggregate_id, written.version)
                    .await
            }
        };
        match restored {
            Ok(()) => debug!(version = written.version, "snapshot write rolled back"),
            Err(err) => error!(
                version = written.version,
                error = %err,
                "snapshot write could not be rolled back"
            ),
        }
    }

    async fn current_version(&self, aggregate_id: Uuid) -> Result<Option<i64>, DomainError> {
        if let Some(manifest) = &self.manifest {
            if let Some(version) = manifest.get_version(aggregate_id).await? {
                return Ok(Some(version));
            }
        }
        let snapshot = self.store.get(aggregate_id).await?;
        Ok(snapshot.map(|snapshot| snapshot.version))
    }
}

impl<A> AggregateRepository<A>
where
    A: AggregateRoot + Default + 'static,
{
    /// Creates a repository that builds fresh aggregates with `A::default`.
    pub fn with_default(store: Arc<dyn SnapshotStore>) -> Self {
        Self::new(store, A::default)
    }
}

impl<A: AggregateRoot> fmt::Debug for AggregateRepository<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateRepository")
            .field("has_manifest", &self.manifest.is_some())
            .field("has_committer", &self.committer.is_some())
            .field("has_publisher", &self.publisher.is_some())
            .field("serialize_writes", &self.gate.is_some())
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

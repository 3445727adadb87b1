//! `PostgreSQL` implementation of the `SnapshotCommitter` trait.
//!
//! The snapshot row and the manifest row are written in one transaction. The
//! existing rows are locked with `SELECT ... FOR UPDATE` before the version
//! check, so a writer that loses the race never leaves its snapshot behind,
//! and a crash between the two writes cannot leave them out of step.

use async_trait::async_trait;
use snapvault_core::commit::SnapshotCommitter;
use snapvault_core::error::DomainError;
use snapvault_core::snapshot::Snapshot;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Commits snapshots and manifest entries stored in the same database.
#[derive(Debug, Clone)]
pub struct PgSnapshotCommitter {
    pool: PgPool,
}

impl PgSnapshotCommitter {
    /// Creates a new `PgSnapshotCommitter`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn version_of(
    tx: &mut Transaction<'_, Postgres>,
    query: &'static str,
    aggregate_id: Uuid,
) -> Result<Option<i64>, DomainError> {
    sqlx::query_scalar::<_, i64>(query)
        .bind(aggregate_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(DomainError::store)
}

#[async_trait]
impl SnapshotCommitter for PgSnapshotCommitter {
    #[instrument(skip(self, snapshot), fields(aggregate_id = %snapshot.aggregate_id, version = snapshot.version))]
    async fn commit(&self, snapshot: &Snapshot, expected_version: i64) -> Result<(), DomainError> {
        let aggregate_id = snapshot.aggregate_id;
        let mut tx = self.pool.begin().await.map_err(DomainError::store)?;

        let recorded = version_of(
            &mut tx,
            "SELECT version FROM aggregate_manifest WHERE aggregate_id = $1 FOR UPDATE",
            aggregate_id,
        )
        .await?;
        let stored = version_of(
            &mut tx,
            "SELECT version FROM aggregate_snapshots WHERE aggregate_id = $1 FOR UPDATE",
            aggregate_id,
        )
        .await?;

        let actual = recorded.or(stored).unwrap_or(0);
        if actual != expected_version {
            warn!(expected = expected_version, actual, "stale snapshot commit rejected");
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        // Nothing was there to lock for a brand-new aggregate, so the manifest
        // insert is what decides between two first writers.
        let manifest_written = if recorded.is_some() {
            sqlx::query(
                "UPDATE aggregate_manifest SET version = $2, updated_at = NOW() \
                 WHERE aggregate_id = $1",
            )
            .bind(aggregate_id)
            .bind(snapshot.version)
            .execute(&mut *tx)
            .await
            .map_err(DomainError::store)?
        } else {
            sqlx::query(
                "INSERT INTO aggregate_manifest (aggregate_id, version, updated_at) \
                 VALUES ($1, $2, NOW()) ON CONFLICT (aggregate_id) DO NOTHING",
            )
            .bind(aggregate_id)
            .bind(snapshot.version)
            .execute(&mut *tx)
            .await
            .map_err(DomainError::store)?
        };
        if manifest_written.rows_affected() != 1 {
            let actual = version_of(
                &mut tx,
                "SELECT version FROM aggregate_manifest WHERE aggregate_id = $1",
                aggregate_id,
            )
            .await?
            .unwrap_or(0);
            warn!(actual, "aggregate created concurrently by another writer");
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        sqlx::query(
            "INSERT INTO aggregate_snapshots (aggregate_id, aggregate_type, version, payload, taken_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (aggregate_id) DO UPDATE SET \
                 aggregate_type = EXCLUDED.aggregate_type, \
                 version = EXCLUDED.version, \
                 payload = EXCLUDED.payload, \
                 taken_at = EXCLUDED.taken_at",
        )
        .bind(aggregate_id)
        .bind(&snapshot.aggregate_type)
        .bind(snapshot.version)
        .bind(&snapshot.payload)
        .bind(snapshot.taken_at)
        .execute(&mut *tx)
        .await
        .map_err(DomainError::store)?;

        tx.commit().await.map_err(DomainError::store)?;
        debug!("snapshot and manifest committed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, aggregate_id: Uuid) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(DomainError::store)?;
        sqlx::query("DELETE FROM aggregate_snapshots WHERE aggregate_id = $1")
            .bind(aggregate_id)
            .execute(&mut *tx)
            .await
            .map_err(DomainError::store)?;
        sqlx::query("DELETE FROM aggregate_manifest WHERE aggregate_id = $1")
            .bind(aggregate_id)
            .execute(&mut *tx)
            .await
            .map_err(DomainError::store)?;
        tx.commit().await.map_err(DomainError::store)?;
        Ok(())
    }
}

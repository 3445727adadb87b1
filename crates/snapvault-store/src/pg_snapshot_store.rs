//! `PostgreSQL` implementation of the `SnapshotStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use snapvault_core::error::DomainError;
use snapvault_core::snapshot::Snapshot;
use snapvault_core::store::SnapshotStore;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::StoreError;

/// PostgreSQL-backed snapshot store. One row per aggregate in
/// `aggregate_snapshots`.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    /// Creates a new `PgSnapshotStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn conflict(&self, aggregate_id: Uuid, expected: i64) -> DomainError {
        let actual = sqlx::query_scalar::<_, i64>(
            "SELECT version FROM aggregate_snapshots WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_optional(&self.pool)
        .await;
        match actual {
            Ok(actual) => {
                let actual = actual.unwrap_or(0);
                warn!(%aggregate_id, expected, actual, "snapshot advanced by another writer");
                DomainError::ConcurrencyConflict {
                    aggregate_id,
                    expected,
                    actual,
                }
            }
            Err(e) => DomainError::store(e),
        }
    }
}

fn snapshot_from_row(row: &PgRow) -> Result<Snapshot, sqlx::Error> {
    Ok(Snapshot {
        aggregate_id: row.try_get("aggregate_id")?,
        aggregate_type: row.try_get("aggregate_type")?,
        version: row.try_get("version")?,
        payload: row.try_get("payload")?,
        taken_at: row.try_get::<DateTime<Utc>, _>("taken_at")?,
    })
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    #[instrument(skip(self))]
    async fn get(&self, aggregate_id: Uuid) -> Result<Option<Snapshot>, DomainError> {
        let row = sqlx::query(
            "SELECT aggregate_id, aggregate_type, version, payload, taken_at \
             FROM aggregate_snapshots WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::store)?;

        row.as_ref()
            .map(snapshot_from_row)
            .transpose()
            .map_err(|e| {
                DomainError::store(StoreError::CorruptRow {
                    aggregate_id,
                    reason: e.to_string(),
                })
            })
    }

    #[instrument(skip(self, snapshot), fields(aggregate_id = %snapshot.aggregate_id, version = snapshot.version))]
    async fn save(&self, snapshot: &Snapshot, expected_version: i64) -> Result<(), DomainError> {
        // A first snapshot is an insert that loses to any existing row; later
        // ones are updates guarded by the stored version.
        let written = if expected_version == 0 {
            sqlx::query(
                "INSERT INTO aggregate_snapshots (aggregate_id, aggregate_type, version, payload, taken_at) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (aggregate_id) DO NOTHING",
            )
            .bind(snapshot.aggregate_id)
            .bind(&snapshot.aggregate_type)
            .bind(snapshot.version)
            .bind(&snapshot.payload)
            .bind(snapshot.taken_at)
            .execute(&self.pool)
            .await
            .map_err(DomainError::store)?
        } else {
            sqlx::query(
                "UPDATE aggregate_snapshots SET \
                     aggregate_type = $2, version = $3, payload = $4, taken_at = $5 \
                 WHERE aggregate_id = $1 AND version = $6",
            )
            .bind(snapshot.aggregate_id)
            .bind(&snapshot.aggregate_type)
            .bind(snapshot.version)
            .bind(&snapshot.payload)
            .bind(snapshot.taken_at)
            .bind(expected_version)
            .execute(&self.pool)
            .await
            .map_err(DomainError::store)?
        };

        if written.rows_affected() == 1 {
            return Ok(());
        }
        Err(self.conflict(snapshot.aggregate_id, expected_version).await)
    }

    #[instrument(skip(self))]
    async fn discard(&self, aggregate_id: Uuid, version: i64) -> Result<(), DomainError> {
        let removed =
            sqlx::query("DELETE FROM aggregate_snapshots WHERE aggregate_id = $1 AND version = $2")
                .bind(aggregate_id)
                .bind(version)
                .execute(&self.pool)
                .await
                .map_err(DomainError::store)?;
        if removed.rows_affected() == 1 {
            return Ok(());
        }
        Err(self.conflict(aggregate_id, version).await)
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, aggregate_id: Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM aggregate_snapshots WHERE aggregate_id = $1")
            .bind(aggregate_id)
            .execute(&self.pool)
            .await
            .map_err(DomainError::store)?;
        Ok(())
    }

    async fn dispose(&self) -> Result<(), DomainError> {
        self.pool.close().await;
        debug!("snapshot store connection pool closed");
        Ok(())
    }
}

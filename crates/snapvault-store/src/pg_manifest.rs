//! `PostgreSQL` implementation of the `AggregateManifest` trait.
//!
//! `update_manifest` is a conditional `UPDATE` guarded by the expected prior
//! version, falling back to an `INSERT ... ON CONFLICT DO NOTHING` for
//! aggregates without an entry. Either statement is atomic on its own, so two
//! writers racing from the same version cannot both succeed, even from
//! different processes.

use async_trait::async_trait;
use snapvault_core::error::DomainError;
use snapvault_core::manifest::{AggregateManifest, ManifestEntry};
use sqlx::{PgPool, Row};
use tracing::{instrument, warn};
use uuid::Uuid;

/// PostgreSQL-backed manifest stored in `aggregate_manifest`.
#[derive(Debug, Clone)]
pub struct PgAggregateManifest {
    pool: PgPool,
}

impl PgAggregateManifest {
    /// Creates a new `PgAggregateManifest`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the full entry for `aggregate_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Manifest` if the query fails.
    pub async fn entry(&self, aggregate_id: Uuid) -> Result<Option<ManifestEntry>, DomainError> {
        let row = sqlx::query(
            "SELECT aggregate_id, version, updated_at FROM aggregate_manifest WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::manifest)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(ManifestEntry {
            aggregate_id: row.try_get("aggregate_id").map_err(DomainError::manifest)?,
            version: row.try_get("version").map_err(DomainError::manifest)?,
            updated_at: row.try_get("updated_at").map_err(DomainError::manifest)?,
        }))
    }
}

#[async_trait]
impl AggregateManifest for PgAggregateManifest {
    #[instrument(skip(self))]
    async fn update_manifest(
        &self,
        aggregate_id: Uuid,
        expected_prior_version: i64,
        new_version: i64,
    ) -> Result<(), DomainError> {
        let updated = sqlx::query(
            "UPDATE aggregate_manifest SET version = $3, updated_at = NOW() \
             WHERE aggregate_id = $1 AND version = $2",
        )
        .bind(aggregate_id)
        .bind(expected_prior_version)
        .bind(new_version)
        .execute(&self.pool)
        .await
        .map_err(DomainError::manifest)?;
        if updated.rows_affected() == 1 {
            return Ok(());
        }

        let inserted = sqlx::query(
            "INSERT INTO aggregate_manifest (aggregate_id, version, updated_at) \
             VALUES ($1, $2, NOW()) ON CONFLICT (aggregate_id) DO NOTHING",
        )
        .bind(aggregate_id)
        .bind(new_version)
        .execute(&self.pool)
        .await
        .map_err(DomainError::manifest)?;
        if inserted.rows_affected() == 1 {
            return Ok(());
        }

        let actual = self.get_version(aggregate_id).await?.unwrap_or(0);
        warn!(actual, "manifest advanced by another writer");
        Err(DomainError::ConcurrencyConflict {
            aggregate_id,
            expected: expected_prior_version,
            actual,
        })
    }

    async fn get_version(&self, aggregate_id: Uuid) -> Result<Option<i64>, DomainError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT version FROM aggregate_manifest WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::manifest)
    }

    async fn remove(&self, aggregate_id: Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM aggregate_manifest WHERE aggregate_id = $1")
            .bind(aggregate_id)
            .execute(&self.pool)
            .await
            .map_err(DomainError::manifest)?;
        Ok(())
    }
}

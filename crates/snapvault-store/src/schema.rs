//! Snapshot store database schema.
//!
//! Kept in step with `migrations/`; `create_schema` lets a fresh database be
//! prepared without running the migrator.

use sqlx::PgPool;

/// SQL to create the snapshot and manifest tables.
pub const CREATE_SNAPSHOT_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS aggregate_snapshots (
    aggregate_id    UUID PRIMARY KEY,
    aggregate_type  VARCHAR(255) NOT NULL,
    version         BIGINT NOT NULL CHECK (version >= 0),
    payload         JSONB NOT NULL,
    taken_at        TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS aggregate_manifest (
    aggregate_id    UUID PRIMARY KEY,
    version         BIGINT NOT NULL CHECK (version >= 0),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_aggregate_snapshots_type
    ON aggregate_snapshots (aggregate_type);
";

/// Creates the snapshot and manifest tables if they do not exist.
///
/// # Errors
///
/// Returns the driver error if any statement fails.
pub async fn create_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(CREATE_SNAPSHOT_TABLES).execute(pool).await?;
    Ok(())
}

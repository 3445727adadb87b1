//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Boxed error used to carry collaborator failures without interpreting them.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Optimistic concurrency conflict.
    #[error(
        "concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual} (reload and retry)"
    )]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The version the writer assumed was on record.
        expected: i64,
        /// The version actually on record (0 when nothing is recorded).
        actual: i64,
    },

    /// The operation is intentionally not provided.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// A snapshot could not be produced or applied.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// The snapshot store failed.
    #[error("snapshot store error: {0}")]
    Store(#[source] BoxError),

    /// The aggregate manifest failed.
    #[error("manifest error: {0}")]
    Manifest(#[source] BoxError),
}

impl DomainError {
    /// Wraps a snapshot store failure.
    pub fn store(err: impl Into<BoxError>) -> Self {
        Self::Store(err.into())
    }

    /// Wraps a manifest failure.
    pub fn manifest(err: impl Into<BoxError>) -> Self {
        Self::Manifest(err.into())
    }

    /// Returns `true` for errors a caller can resolve by reloading and
    /// retrying the business operation.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

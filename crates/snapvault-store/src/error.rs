//! Backend error types.

use thiserror::Error;

/// Failures raised by the backends themselves rather than by the database
/// driver.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store was used after `dispose()`.
    #[error("store has been disposed")]
    Disposed,

    /// A stored row could not be read back.
    #[error("corrupt row for aggregate {aggregate_id}: {reason}")]
    CorruptRow {
        /// The aggregate whose row is unreadable.
        aggregate_id: uuid::Uuid,
        /// What was wrong with it.
        reason: String,
    },
}

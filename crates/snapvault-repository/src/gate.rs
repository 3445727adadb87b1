//! Per-aggregate write serialization.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Hands out one async lock per aggregate id. Entries nobody holds or waits
/// on are pruned on the next acquire.
#[derive(Debug, Default)]
pub(crate) struct WriteGate {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl WriteGate {
    /// Waits until no other save or delete of `aggregate_id` is in flight.
    pub(crate) async fn acquire(&self, aggregate_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(aggregate_id).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_second_acquire_waits_for_release() {
        let gate = WriteGate::default();
        let id = Uuid::new_v4();

        let guard = gate.acquire(id).await;
        let blocked = tokio::time::timeout(Duration::from_millis(20), gate.acquire(id)).await;
        assert!(blocked.is_err());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(20), gate.acquire(id)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_distinct_ids_do_not_block_each_other() {
        let gate = WriteGate::default();

        let _first = gate.acquire(Uuid::new_v4()).await;
        let second =
            tokio::time::timeout(Duration::from_millis(20), gate.acquire(Uuid::new_v4())).await;

        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let gate = WriteGate::default();
        for _ in 0..5 {
            let _guard = gate.acquire(Uuid::new_v4()).await;
        }

        let _held = gate.acquire(Uuid::new_v4()).await;

        assert_eq!(gate.tracked().await, 1);
    }
}

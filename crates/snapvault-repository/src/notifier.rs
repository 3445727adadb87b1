//! In-process broadcast of "snapshot persisted" facts.
//!
//! The repository is the only producer. Every live [`ChangeSubscription`]
//! receives each notification in emission order; subscriptions created later
//! never see earlier notifications. A slow subscriber cannot hold up or fail a
//! save: once it falls more than the configured capacity behind it skips the
//! oldest notifications and carries on.

use std::sync::{Arc, PoisonError, RwLock};

use snapvault_core::snapshot::Snapshot;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{trace, warn};
use uuid::Uuid;

/// A snapshot that was just durably written.
#[derive(Debug, Clone)]
pub struct ChangeNotification {
    /// The aggregate whose snapshot changed.
    pub aggregate_id: Uuid,
    /// The snapshot as written.
    pub snapshot: Arc<Snapshot>,
}

impl ChangeNotification {
    /// Wraps a freshly written snapshot.
    #[must_use]
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            aggregate_id: snapshot.aggregate_id,
            snapshot: Arc::new(snapshot),
        }
    }

    /// Version of the written snapshot.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.snapshot.version
    }
}

/// Single-producer, multi-subscriber change stream.
#[derive(Debug)]
pub struct ChangeNotifier {
    sender: RwLock<Option<broadcast::Sender<ChangeNotification>>>,
}

impl ChangeNotifier {
    /// Creates an open notifier buffering up to `capacity` notifications per
    /// subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: RwLock::new(Some(sender)),
        }
    }

    /// Opens a subscription that receives every notification emitted from
    /// now on. Subscribing to a closed notifier yields a subscription that
    /// has already ended.
    pub fn subscribe(&self) -> ChangeSubscription {
        let guard = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        let receiver = match guard.as_ref() {
            Some(sender) => sender.subscribe(),
            None => {
                let (_, receiver) = broadcast::channel(1);
                receiver
            }
        };
        ChangeSubscription { receiver }
    }

    /// Emits `notification` to every live subscriber and returns how many
    /// were reached. Having no subscribers, or being closed, is not an error.
    pub fn notify(&self, notification: ChangeNotification) -> usize {
        let guard = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            trace!(aggregate_id = %notification.aggregate_id, "notifier closed; change dropped");
            return 0;
        };
        sender.send(notification).unwrap_or(0)
    }

    /// Stops the stream. Live subscriptions end once they drain what was
    /// already emitted, and later `notify` calls are dropped.
    pub fn close(&self) {
        self.sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

/// Receiving end of a [`ChangeNotifier`].
#[derive(Debug)]
pub struct ChangeSubscription {
    receiver: broadcast::Receiver<ChangeNotification>,
}

impl ChangeSubscription {
    /// Waits for the next notification. Returns `None` once the notifier is
    /// closed and everything emitted before closing has been received.
    pub async fn recv(&mut self) -> Option<ChangeNotification> {
        loop {
            match self.receiver.recv().await {
                Ok(notification) => return Some(notification),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change subscriber fell behind; notifications skipped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next notification if one is already buffered.
    pub fn try_recv(&mut self) -> Option<ChangeNotification> {
        loop {
            match self.receiver.try_recv() {
                Ok(notification) => return Some(notification),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "change subscriber fell behind; notifications skipped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn snapshot(aggregate_id: Uuid, version: i64) -> Snapshot {
        Snapshot {
            aggregate_id,
            aggregate_type: "test.tally".into(),
            version,
            payload: serde_json::json!({}),
            taken_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_each_notification_in_order() {
        // Arrange
        let notifier = ChangeNotifier::new(8);
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();
        let id = Uuid::new_v4();

        // Act
        notifier.notify(ChangeNotification::new(snapshot(id, 1)));
        let reached = notifier.notify(ChangeNotification::new(snapshot(id, 2)));

        // Assert
        assert_eq!(reached, 2);
        for subscription in [&mut first, &mut second] {
            assert_eq!(subscription.recv().await.unwrap().version(), 1);
            assert_eq!(subscription.recv().await.unwrap().version(), 2);
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_does_not_see_earlier_notifications() {
        // Arrange
        let notifier = ChangeNotifier::new(8);
        let _early = notifier.subscribe();
        let id = Uuid::new_v4();
        notifier.notify(ChangeNotification::new(snapshot(id, 1)));

        // Act
        let mut late = notifier.subscribe();

        // Assert
        assert!(late.try_recv().is_none());
    }

    #[test]
    fn test_notify_without_subscribers_is_not_an_error() {
        let notifier = ChangeNotifier::new(8);

        let reached = notifier.notify(ChangeNotification::new(snapshot(Uuid::new_v4(), 1)));

        assert_eq!(reached, 0);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_does_not_affect_others() {
        // Arrange
        let notifier = ChangeNotifier::new(8);
        let dropped = notifier.subscribe();
        let mut kept = notifier.subscribe();
        drop(dropped);

        // Act
        let reached = notifier.notify(ChangeNotification::new(snapshot(Uuid::new_v4(), 1)));

        // Assert
        assert_eq!(reached, 1);
        assert_eq!(kept.recv().await.unwrap().version(), 1);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_oldest_and_keeps_receiving() {
        // Arrange
        let notifier = ChangeNotifier::new(2);
        let mut slow = notifier.subscribe();
        let id = Uuid::new_v4();

        // Act
        for version in 1..=4 {
            notifier.notify(ChangeNotification::new(snapshot(id, version)));
        }

        // Assert
        assert_eq!(slow.recv().await.unwrap().version(), 3);
        assert_eq!(slow.recv().await.unwrap().version(), 4);
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions_after_draining() {
        // Arrange
        let notifier = ChangeNotifier::new(8);
        let mut subscription = notifier.subscribe();
        notifier.notify(ChangeNotification::new(snapshot(Uuid::new_v4(), 1)));

        // Act
        notifier.close();
        let after_close = notifier.notify(ChangeNotification::new(snapshot(Uuid::new_v4(), 2)));

        // Assert
        assert!(notifier.is_closed());
        assert_eq!(after_close, 0);
        assert_eq!(subscription.recv().await.unwrap().version(), 1);
        assert!(subscription.recv().await.is_none());
        assert!(notifier.subscribe().recv().await.is_none());
        assert_eq!(notifier.subscriber_count(), 0);
    }
}

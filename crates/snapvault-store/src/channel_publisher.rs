//! In-process event publisher over a `tokio` broadcast channel.

use async_trait::async_trait;
use snapvault_core::event::DomainEvent;
use snapvault_core::publisher::EventPublisher;
use tokio::sync::broadcast;
use tracing::trace;

/// Default number of events buffered per subscriber.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Broadcasts every published event to all current subscribers.
///
/// Publishing with nobody listening is not an error. Subscribers that fall
/// behind lose the oldest events, as with any `broadcast` receiver.
#[derive(Debug, Clone)]
pub struct ChannelEventPublisher<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> Default for ChannelEventPublisher<E> {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl<E: Clone> ChannelEventPublisher<E> {
    /// Creates a publisher buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receives every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl<E> EventPublisher<E> for ChannelEventPublisher<E>
where
    E: DomainEvent + Clone + 'static,
{
    async fn publish(&self, event: &E) {
        match self.sender.send(event.clone()) {
            Ok(receivers) => trace!(
                event_type = event.event_type(),
                receivers,
                "event published"
            ),
            Err(_) => trace!(event_type = event.event_type(), "event published with no subscribers"),
        }
    }
}

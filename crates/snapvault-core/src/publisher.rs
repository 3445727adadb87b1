//! Event publisher port.

use async_trait::async_trait;

use crate::event::DomainEvent;

/// Fire-and-forget delivery of committed domain events.
///
/// Publishing cannot fail from the caller's point of view. Implementations
/// log their own delivery problems.
#[async_trait]
pub trait EventPublisher<E: DomainEvent>: Send + Sync {
    /// Delivers `event` to every current subscriber.
    async fn publish(&self, event: &E);
}

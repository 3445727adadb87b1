//! Test publisher — records every published event.

use std::sync::Mutex;

use async_trait::async_trait;
use snapvault_core::event::DomainEvent;
use snapvault_core::publisher::EventPublisher;

use crate::call_log::{Call, CallLog};

/// An event publisher that keeps a copy of each event and logs the call.
#[derive(Debug)]
pub struct RecordingEventPublisher<E> {
    published: Mutex<Vec<E>>,
    log: CallLog,
}

impl<E> Default for RecordingEventPublisher<E> {
    fn default() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            log: CallLog::default(),
        }
    }
}

impl<E: Clone> RecordingEventPublisher<E> {
    /// Creates a publisher with its own log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a publisher that records into `log`.
    #[must_use]
    pub fn with_log(log: CallLog) -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            log,
        }
    }

    /// Returns every event published so far, in publish order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published(&self) -> Vec<E> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl<E> EventPublisher<E> for RecordingEventPublisher<E>
where
    E: DomainEvent + Clone,
{
    async fn publish(&self, event: &E) {
        let meta = event.metadata();
        self.log.record(Call::Publish {
            aggregate_id: meta.aggregate_id,
            version: meta.sequence_number,
        });
        self.published.lock().unwrap().push(event.clone());
    }
}

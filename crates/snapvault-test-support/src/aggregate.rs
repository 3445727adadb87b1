//! `Tally` — a minimal snapshot-capable aggregate for repository tests.

use serde::{Deserialize, Serialize};
use snapvault_core::aggregate::AggregateRoot;
use snapvault_core::clock::Clock;
use snapvault_core::error::DomainError;
use snapvault_core::event::{DomainEvent, EventMetadata};
use snapvault_core::snapshot::Snapshot;
use uuid::Uuid;

/// Aggregate type name recorded on `Tally` snapshots.
pub const TALLY_AGGREGATE_TYPE: &str = "test.tally";

/// Event type identifier for [`TallyEvent`].
pub const TALLY_ADDED_EVENT_TYPE: &str = "test.tally_added";

/// Raised whenever an amount is added to a tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Amount added.
    pub amount: i64,
}

impl DomainEvent for TallyEvent {
    fn event_type(&self) -> &'static str {
        TALLY_ADDED_EVENT_TYPE
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({ "amount": self.amount })
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TallyState {
    total: i64,
    entries: u32,
}

/// A running total. Each `add` raises one event and bumps the version.
#[derive(Debug)]
pub struct Tally {
    id: Uuid,
    version: i64,
    total: i64,
    entries: u32,
    uncommitted_events: Vec<TallyEvent>,
}

impl Default for Tally {
    fn default() -> Self {
        Self::with_id(Uuid::new_v4())
    }
}

impl Tally {
    /// Creates an empty, version-0 tally with the given identity.
    #[must_use]
    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            total: 0,
            entries: 0,
            uncommitted_events: Vec::new(),
        }
    }

    /// The running total.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.total
    }

    /// Number of amounts added over the tally's lifetime.
    #[must_use]
    pub fn entries(&self) -> u32 {
        self.entries
    }

    /// Adds `amount`, raising a [`TallyEvent`].
    pub fn add(&mut self, amount: i64, clock: &dyn Clock) {
        let correlation_id = Uuid::new_v4();
        let event = TallyEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: TALLY_ADDED_EVENT_TYPE.to_owned(),
                aggregate_id: self.id,
                sequence_number: self.version + 1,
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            amount,
        };
        self.total += amount;
        self.entries += 1;
        self.version += 1;
        self.uncommitted_events.push(event);
    }

    /// Builds a tally whose first uncommitted event claims to follow
    /// `loaded_at`. Used to simulate a writer holding a stale copy.
    #[must_use]
    pub fn stale(id: Uuid, loaded_at: i64, amount: i64, clock: &dyn Clock) -> Self {
        let mut tally = Self::with_id(id);
        tally.version = loaded_at;
        tally.add(amount, clock);
        tally
    }
}

impl AggregateRoot for Tally {
    type Event = TallyEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn commit(&mut self) {
        self.uncommitted_events.clear();
    }

    fn to_snapshot(&self) -> Result<Snapshot, DomainError> {
        let state = TallyState {
            total: self.total,
            entries: self.entries,
        };
        let taken_at = self
            .uncommitted_events
            .last()
            .map_or_else(chrono::Utc::now, |event| event.metadata.occurred_at);
        Snapshot::from_state(self.id, TALLY_AGGREGATE_TYPE, self.version, &state, taken_at)
    }

    fn load_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), DomainError> {
        let state: TallyState = snapshot.decode()?;
        self.id = snapshot.aggregate_id;
        self.version = snapshot.version;
        self.total = state.total;
        self.entries = state.entries;
        self.uncommitted_events.clear();
        Ok(())
    }
}

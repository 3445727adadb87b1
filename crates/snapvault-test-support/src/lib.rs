//! Shared test collaborators and aggregates for snapvault.

mod aggregate;
mod call_log;
mod clock;
mod manifest;
mod publisher;
mod store;

pub use aggregate::{TALLY_ADDED_EVENT_TYPE, TALLY_AGGREGATE_TYPE, Tally, TallyEvent};
pub use call_log::{Call, CallLog};
pub use clock::{FixedClock, fixed_now};
pub use manifest::{FailingManifest, FlakyManifest, RecordingManifest};
pub use publisher::RecordingEventPublisher;
pub use store::{FailingSnapshotStore, RecordingSnapshotStore};

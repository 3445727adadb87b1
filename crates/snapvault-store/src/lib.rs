//! Backends for the snapvault repository ports.
//!
//! - [`memory`] — in-process snapshot store and manifest for tests, demos and
//!   single-process deployments.
//! - [`pg_snapshot_store`] / [`pg_manifest`] — PostgreSQL implementations.
//! - [`pg_committer`] — writes a snapshot and its manifest entry in one
//!   PostgreSQL transaction.
//! - [`channel_publisher`] — in-process event publisher over a broadcast
//!   channel.

pub mod channel_publisher;
pub mod error;
pub mod memory;
pub mod pg_committer;
pub mod pg_manifest;
pub mod pg_snapshot_store;
pub mod schema;

pub use channel_publisher::ChannelEventPublisher;
pub use error::StoreError;
pub use memory::{InMemoryManifest, InMemorySnapshotStore};
pub use pg_committer::PgSnapshotCommitter;
pub use pg_manifest::PgAggregateManifest;
pub use pg_snapshot_store::PgSnapshotStore;

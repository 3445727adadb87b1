//! snapvault repository — loads, saves and deletes snapshot-backed
//! aggregates.
//!
//! [`AggregateRepository`] checks the aggregate's expected version against
//! the manifest (or the stored snapshot), writes the new snapshot, records it
//! in the manifest, broadcasts a [`ChangeNotification`] and only then
//! publishes the aggregate's domain events.

pub mod config;
mod gate;
pub mod notifier;
pub mod repository;

pub use config::RepositoryConfig;
pub use notifier::{ChangeNotification, ChangeNotifier, ChangeSubscription};
pub use repository::AggregateRepository;

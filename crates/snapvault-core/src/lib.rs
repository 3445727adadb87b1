//! snapvault core — aggregate and persistence contracts.
//!
//! This crate defines the traits an aggregate must implement to be persisted
//! as a snapshot, and the narrow ports (snapshot store, manifest, event
//! publisher) the repository orchestrates. It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod commit;
pub mod error;
pub mod event;
pub mod manifest;
pub mod publisher;
pub mod snapshot;
pub mod store;

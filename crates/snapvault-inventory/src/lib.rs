//! snapvault inventory context.
//!
//! A small inventory aggregate (items plus one equipped item) persisted as
//! snapshots through [`snapvault_repository::AggregateRepository`].

pub mod application;
pub mod domain;

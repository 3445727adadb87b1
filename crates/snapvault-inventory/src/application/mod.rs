//! Command and query handlers for the inventory context.

pub mod command_handlers;
pub mod query_handlers;

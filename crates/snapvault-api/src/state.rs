//! Shared application state.

use std::fmt;
use std::sync::Arc;

use snapvault_core::clock::Clock;
use snapvault_inventory::domain::aggregates::Inventory;
use snapvault_repository::AggregateRepository;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock stamped onto every event.
    pub clock: Arc<dyn Clock>,
    /// Repository persisting inventories.
    pub inventory: Arc<AggregateRepository<Inventory>>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, inventory: Arc<AggregateRepository<Inventory>>) -> Self {
        Self { clock, inventory }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("inventory", &self.inventory)
            .finish_non_exhaustive()
    }
}

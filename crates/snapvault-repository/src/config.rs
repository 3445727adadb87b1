//! Repository configuration.

/// Default number of change notifications buffered per subscriber.
pub const DEFAULT_NOTIFIER_CAPACITY: usize = 256;

/// Tunables for an [`AggregateRepository`](crate::AggregateRepository).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Notifications a subscriber may fall behind by before it starts
    /// skipping. Values below 1 are raised to 1.
    pub notifier_capacity: usize,
    /// Serialize save and delete per aggregate id inside this process.
    ///
    /// With this off, two concurrent saves of the same aggregate can both
    /// pass the version check; only a compare-and-set manifest catches the
    /// loser, after its snapshot write.
    pub serialize_writes: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            notifier_capacity: DEFAULT_NOTIFIER_CAPACITY,
            serialize_writes: true,
        }
    }
}

impl RepositoryConfig {
    /// Sets the per-subscriber notification buffer.
    #[must_use]
    pub fn with_notifier_capacity(mut self, capacity: usize) -> Self {
        self.notifier_capacity = capacity.max(1);
        self
    }

    /// Enables or disables the per-aggregate write gate.
    #[must_use]
    pub fn with_serialize_writes(mut self, enabled: bool) -> Self {
        self.serialize_writes = enabled;
        self
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generation counter shared by every cached node under one engine.
///
/// Cloning shares the underlying counter; it never forks it. A directory's
/// cached listing and mtime are tagged with the generation they were observed
/// in, and become suspect as soon as the clock moves past it.
#[derive(Debug, Clone, Default)]
pub struct LogicalClock {
    time: Arc<AtomicU64>,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current generation.
    pub fn now(&self) -> u64 {
        self.time.load(Ordering::Acquire)
    }

    /// Start a new generation and return it.
    pub fn advance(&self) -> u64 {
        self.time.fetch_add(1, Ordering::AcqRel) + 1
    }
}

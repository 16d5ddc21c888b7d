//! Stress run configuration.

use core::time::Duration;

/// Shape of a stress run: how many threads, how much work each does and an
/// optional wall-clock cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressConfig {
    thread_count: usize,
    iterations: usize,
    time_limit: Option<Duration>,

    /// Bound for the shared collections built by the `sync` runners.
    capacity: usize,
}

impl StressConfig {
    /// Defaults to 4 threads of 1000 iterations each, no time limit and a
    /// capacity of 64.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            thread_count: 4,
            iterations: 1000,
            time_limit: None,
            capacity: 64,
        }
    }

    #[must_use]
    pub const fn threads(mut self, count: usize) -> Self {
        self.thread_count = count;
        self
    }

    #[must_use]
    pub const fn iterations(mut self, count: usize) -> Self {
        self.iterations = count;
        self
    }

    /// Stops every thread once `limit` elapses, even mid-way through its
    /// iterations.
    #[must_use]
    pub const fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub const fn thread_count(&self) -> usize {
        self.thread_count
    }

    #[must_use]
    pub const fn iteration_count(&self) -> usize {
        self.iterations
    }

    #[must_use]
    pub const fn limit(&self) -> Option<Duration> {
        self.time_limit
    }

    #[must_use]
    pub const fn bounded_capacity(&self) -> usize {
        self.capacity
    }

    /// Total operations a run performs when it is not cut short.
    #[must_use]
    pub const fn planned_operations(&self) -> usize {
        self.thread_count * self.iterations
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self::new()
    }
}

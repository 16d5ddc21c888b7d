//! Stress test framework for the concurrent primitives.
//!
//! [`StressHarness`] spawns the configured number of threads, holds them on a
//! [`PhasedBarrier`] until every one of them is running, then lets them
//! hammer the operation under test together and tallies the outcome.

use core::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use foundation_concurrent::PhasedBarrier;

pub mod config;
pub mod sync;

pub use config::StressConfig;

/// Outcome of a stress run.
#[derive(Debug, Clone, PartialEq)]
pub struct StressResult {
    pub successes: usize,
    pub failures: usize,

    /// Wall-clock time from release to the last thread finishing.
    pub duration: Duration,
    pub thread_count: usize,
}

impl StressResult {
    #[must_use]
    pub const fn new(
        successes: usize,
        failures: usize,
        duration: Duration,
        thread_count: usize,
    ) -> Self {
        Self {
            successes,
            failures,
            duration,
            thread_count,
        }
    }

    #[must_use]
    pub const fn total_operations(&self) -> usize {
        self.successes + self.failures
    }

    /// Fraction of operations that succeeded, `0.0` for an empty run.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total_operations() == 0 {
            return 0.0;
        }
        self.successes as f64 / self.total_operations() as f64
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn operations_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.total_operations() as f64 / secs
    }
}

/// Runs an operation from many threads at once.
pub struct StressHarness {
    config: StressConfig,
}

impl StressHarness {
    #[must_use]
    pub const fn new(config: StressConfig) -> Self {
        Self { config }
    }

    /// Runs `operation(thread_id, iteration)` on every thread, counting a
    /// `true` return as a success.
    ///
    /// ```
    /// use foundation_testing::stress::{StressConfig, StressHarness};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let counter = Arc::new(AtomicUsize::new(0));
    /// let harness = StressHarness::new(StressConfig::new().threads(4).iterations(100));
    ///
    /// let seen = Arc::clone(&counter);
    /// let result = harness.run(move |_thread_id, _iteration| {
    ///     seen.fetch_add(1, Ordering::Relaxed);
    ///     true
    /// });
    ///
    /// assert_eq!(counter.load(Ordering::Relaxed), 400);
    /// assert_eq!(result.successes, 400);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics when a worker thread panics or the thread count exceeds what
    /// the start barrier can hold.
    pub fn run<F>(self, operation: F) -> StressResult
    where
        F: Fn(usize, usize) -> bool + Send + Sync + 'static,
    {
        let thread_count = self.config.thread_count();
        let iterations = self.config.iteration_count();

        let operation = Arc::new(operation);
        let successes = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));
        let start_line = Arc::new(
            PhasedBarrier::new(thread_count).expect("thread count fits the start barrier"),
        );

        tracing::debug!(thread_count, iterations, "starting stress run");

        let started = Instant::now();
        let handles: Vec<_> = (0..thread_count)
            .map(|thread_id| {
                let operation = Arc::clone(&operation);
                let successes = Arc::clone(&successes);
                let failures = Arc::clone(&failures);
                let start_line = Arc::clone(&start_line);
                let time_limit = self.config.limit();

                thread::spawn(move || {
                    if let Err(err) = start_line.signal_and_wait() {
                        tracing::warn!(thread_id, error = %err, "stress thread missed the start");
                        failures.fetch_add(iterations, Ordering::Relaxed);
                        return;
                    }

                    let stop_at = time_limit.map(|limit| Instant::now() + limit);
                    for iteration in 0..iterations {
                        if stop_at.is_some_and(|at| Instant::now() >= at) {
                            break;
                        }

                        if operation(thread_id, iteration) {
                            successes.fetch_add(1, Ordering::Relaxed);
                        } else {
                            failures.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Thread panicked during stress test");
        }

        let result = StressResult::new(
            successes.load(Ordering::Relaxed),
            failures.load(Ordering::Relaxed),
            started.elapsed(),
            thread_count,
        );
        tracing::debug!(
            successes = result.successes,
            failures = result.failures,
            "stress run finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_failures_separately() {
        let harness = StressHarness::new(StressConfig::new().threads(3).iterations(10));
        let result = harness.run(|_thread_id, iteration| iteration % 2 == 0);

        assert_eq!(result.successes, 15);
        assert_eq!(result.failures, 15);
        assert!((result.success_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn time_limit_cuts_run_short() {
        let config = StressConfig::new()
            .threads(2)
            .iterations(1_000_000)
            .time_limit(Duration::from_millis(50));
        let result = StressHarness::new(config).run(|_, _| {
            thread::sleep(Duration::from_millis(1));
            true
        });

        assert!(result.total_operations() > 0);
        assert!(result.total_operations() < config.planned_operations());
    }

    #[test]
    fn empty_run_reports_zero_rate() {
        let result = StressHarness::new(StressConfig::new().threads(0)).run(|_, _| true);
        assert_eq!(result.total_operations(), 0);
        assert!(result.success_rate().abs() < f64::EPSILON);
    }
}

//! `PhasedBarrier` stress runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use foundation_concurrent::PhasedBarrier;

use crate::stress::{StressConfig, StressHarness, StressResult};

/// Every thread signals the same barrier once per iteration. An iteration
/// succeeds when the barrier has advanced past it by the time the thread is
/// released.
///
/// Threads must stay in lockstep, so any time limit on `config` is ignored.
///
/// ```
/// use foundation_testing::stress::{sync::run_barrier_stress, StressConfig};
///
/// let result = run_barrier_stress(StressConfig::new().threads(4).iterations(50));
/// assert_eq!(result.failures, 0);
/// ```
///
/// # Panics
///
/// Panics when the thread count exceeds the barrier's participant limit.
#[must_use]
pub fn run_barrier_stress(config: StressConfig) -> StressResult {
    let phases = Arc::new(AtomicU64::new(0));
    let counted = Arc::clone(&phases);
    let barrier = Arc::new(
        PhasedBarrier::with_post_phase(config.thread_count(), move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .expect("thread count fits the barrier"),
    );

    let lockstep = StressConfig::new()
        .threads(config.thread_count())
        .iterations(config.iteration_count());

    StressHarness::new(lockstep).run(move |_thread_id, iteration| {
        if barrier.signal_and_wait().is_err() {
            return false;
        }
        let passed = iteration as u64 + 1;
        barrier.current_phase_number() >= passed && phases.load(Ordering::SeqCst) >= passed
    })
}

/// Threads add and remove a participant on a barrier nobody waits on. The
/// participant count returns to its starting value when every add is
/// matched by a remove.
///
/// # Panics
///
/// Panics if the barrier cannot be created, which cannot happen for zero
/// participants.
#[must_use]
pub fn run_barrier_churn_stress(config: StressConfig) -> (StressResult, usize) {
    let barrier = Arc::new(PhasedBarrier::new(0).expect("empty barrier"));
    let shared = Arc::clone(&barrier);

    let result = StressHarness::new(config).run(move |_thread_id, _iteration| {
        shared.add_participant().is_ok() && shared.remove_participant().is_ok()
    });
    (result, barrier.participant_count())
}

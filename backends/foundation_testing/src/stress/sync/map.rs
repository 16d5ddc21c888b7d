//! `ConcurrentMap` stress runs.

use std::sync::Arc;

use foundation_concurrent::ConcurrentMap;

use crate::stress::{StressConfig, StressHarness, StressResult};

/// Number of hot keys every thread bumps.
pub const SHARED_KEYS: usize = 16;

/// Each iteration adds a key private to the thread and bumps one of
/// [`SHARED_KEYS`] counters shared by every thread.
///
/// Returns the run result along with the final map so callers can check
/// that it holds one private key per iteration and that the shared
/// counters add up to the number of operations.
///
/// ```
/// use foundation_testing::stress::{sync::{map::SHARED_KEYS, run_map_stress}, StressConfig};
///
/// let config = StressConfig::new().threads(4).iterations(250);
/// let (result, map) = run_map_stress(config);
///
/// assert_eq!(result.failures, 0);
/// assert_eq!(map.len(), 1000 + SHARED_KEYS);
/// ```
#[must_use]
pub fn run_map_stress(config: StressConfig) -> (StressResult, Arc<ConcurrentMap<(usize, usize), usize>>) {
    let map = Arc::new(ConcurrentMap::new());
    let shared = Arc::clone(&map);

    let result = StressHarness::new(config).run(move |thread_id, iteration| {
        let private_key = (thread_id + 1, iteration);
        if !shared.try_add(private_key, iteration) {
            return false;
        }

        let hot_key = (0, iteration % SHARED_KEYS);
        let bumped = shared.add_or_update(hot_key, 1, |_, count| count + 1);
        bumped >= 1 && shared.get(&private_key) == Some(iteration)
    });
    (result, map)
}

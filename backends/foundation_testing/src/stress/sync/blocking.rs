//! `BlockingCollection` stress runs.

use std::sync::Arc;
use std::time::Duration;

use foundation_concurrent::blocking::{self, BlockingCollection, TryTakeResult};
use foundation_concurrent::WaitTimeout;

use crate::stress::{StressConfig, StressHarness, StressResult};

/// How long a take may wait before the iteration counts as failed. Every
/// thread adds before it takes, so a healthy collection never gets close.
const TAKE_PATIENCE: Duration = Duration::from_secs(5);

fn item_for(thread_id: usize, iteration: usize) -> usize {
    thread_id * 1_000_000 + iteration
}

/// Every iteration adds one item to a shared bounded collection and then
/// takes one back out.
///
/// ```
/// use foundation_testing::stress::{sync::run_blocking_collection_stress, StressConfig};
///
/// let config = StressConfig::new().threads(8).iterations(200).capacity(4);
/// let result = run_blocking_collection_stress(config);
/// assert!(result.success_rate() > 0.99);
/// ```
///
/// # Panics
///
/// Panics when the configured capacity is zero.
#[must_use]
pub fn run_blocking_collection_stress(config: StressConfig) -> StressResult {
    let collection = Arc::new(
        BlockingCollection::<usize>::bounded(config.bounded_capacity())
            .expect("capacity is greater than zero"),
    );

    StressHarness::new(config).run(move |thread_id, iteration| {
        if collection.add(item_for(thread_id, iteration)).is_err() {
            return false;
        }
        matches!(
            collection.try_take(TAKE_PATIENCE.into()),
            Ok(TryTakeResult::Taken(_))
        )
    })
}

/// Like [`run_blocking_collection_stress`] but spreads the items over four
/// bounded collections through `add_to_any` and `try_take_from_any`.
///
/// # Panics
///
/// Panics when the configured capacity is zero.
#[must_use]
pub fn run_any_collection_stress(config: StressConfig) -> StressResult {
    let collections: Arc<Vec<BlockingCollection<usize>>> = Arc::new(
        (0..4)
            .map(|_| {
                BlockingCollection::bounded(config.bounded_capacity())
                    .expect("capacity is greater than zero")
            })
            .collect(),
    );

    StressHarness::new(config).run(move |thread_id, iteration| {
        let members: Vec<&BlockingCollection<usize>> = collections.iter().collect();

        if blocking::add_to_any(&members, item_for(thread_id, iteration)).is_err() {
            return false;
        }
        match blocking::try_take_from_any(&members, WaitTimeout::from(TAKE_PATIENCE)) {
            Ok(TryTakeResult::Taken((index, _))) => index < members.len(),
            Ok(outcome) => {
                tracing::warn!(?outcome, "take from any came back empty");
                false
            }
            Err(_) => false,
        }
    })
}

//! Bounded blocking producer/consumer collections.
//!
//! [`BlockingCollection`] wraps any [`ProducerConsumer`] container (FIFO
//! [`ConcurrentQueue`] by default) and adds capacity bounds, completion and
//! disposal. The free functions in this module add to or take from whichever
//! of several collections is ready first.

mod any;
mod collection;
mod containers;
mod iter;

pub use any::{
    add_to_any, take_from_any, try_add_to_any, try_add_to_any_millis, try_take_from_any,
    try_take_from_any_millis, MAX_ANY_COLLECTIONS,
};
pub use collection::{BlockingCollection, TryAddResult, TryTakeResult};
pub use containers::{ConcurrentBag, ConcurrentQueue, ConcurrentStack, ProducerConsumer};
pub use iter::{ConsumingIter, SnapshotIter};

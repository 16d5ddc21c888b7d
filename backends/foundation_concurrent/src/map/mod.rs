//! Lock-striped concurrent hash map.

mod comparer;
mod segmented;

pub use comparer::{CaseInsensitive, DefaultComparer, KeyComparer};
pub use segmented::{default_concurrency_level, ConcurrentMap, Iter, DEFAULT_CAPACITY};

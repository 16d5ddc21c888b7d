//! Ready-made stress runs, one module per primitive.

pub mod barrier;
pub mod blocking;
pub mod map;

pub use barrier::{run_barrier_churn_stress, run_barrier_stress};
pub use blocking::{run_any_collection_stress, run_blocking_collection_stress};
pub use map::run_map_stress;

//! Classic concurrency patterns built on the foundation_concurrent primitives:
//! - a producer/consumer pipeline stage
//! - workers stepping through phases together
//! - a worker pool fed from a blocking collection

pub mod phased_workers;
pub mod pipeline;
pub mod worker_pool;

pub use phased_workers::PhasedWorkers;
pub use pipeline::Pipeline;
pub use worker_pool::WorkerPool;

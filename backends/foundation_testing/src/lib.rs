//! Reusable stress testing infrastructure for the foundation_concurrent
//! primitives.
//!
//! This crate provides:
//! - **Stress test framework**: threads released together through a
//!   `PhasedBarrier`, with success and failure tallies
//! - **Ready-made runs**: one per primitive under [`stress::sync`]
//! - **Common scenarios**: pipeline stages, phased workers, worker pools
//!
//! # Examples
//!
//! ```rust
//! use foundation_testing::stress::{StressConfig, StressHarness};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let config = StressConfig::new()
//!     .threads(10)
//!     .iterations(1000);
//!
//! let counter = Arc::new(AtomicUsize::new(0));
//! let harness = StressHarness::new(config);
//!
//! let counter_clone = Arc::clone(&counter);
//! let results = harness.run(move |_thread_id, _iteration| {
//!     counter_clone.fetch_add(1, Ordering::Relaxed);
//!     true
//! });
//!
//! assert_eq!(results.successes, 10000);
//! assert!(results.success_rate() > 0.99);
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod scenarios;
pub mod stress;

pub use stress::{StressConfig, StressHarness, StressResult};

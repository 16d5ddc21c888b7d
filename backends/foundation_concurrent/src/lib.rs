//! Thread coordination primitives for the ewe_platform backends.
//!
//! - [`barrier::PhasedBarrier`], a resizable rendezvous barrier with an
//!   optional post-phase action.
//! - [`blocking::BlockingCollection`], a bounded producer/consumer collection
//!   plus the multi-collection `add_to_any`/`take_from_any` operations.
//! - [`map::ConcurrentMap`], a lock-striped hash map.
//!
//! Every blocking call takes a [`timeout::WaitTimeout`] and reports timeouts
//! as ordinary results, failures come back as [`errors::ConcurrentError`].

pub mod barrier;
pub mod blocking;
pub mod config;
pub mod errors;
pub mod map;
pub mod timeout;

pub use barrier::PhasedBarrier;
pub use blocking::BlockingCollection;
pub use config::ConcurrencyConfig;
pub use errors::{ConcurrentError, ConcurrentResult};
pub use map::ConcurrentMap;
pub use timeout::WaitTimeout;

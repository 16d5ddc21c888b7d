//! Phased rendezvous barrier.
//!
//! A [`PhasedBarrier`] coordinates a set of participants that can be resized
//! between phases. The last participant to arrive runs the optional
//! post-phase action before every participant is released into the next phase.

mod phased;

pub use phased::*;

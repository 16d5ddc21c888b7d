//! Workers that advance through a fixed number of phases in lockstep.

use std::sync::Arc;
use std::thread;

use foundation_concurrent::errors::BoxedError;
use foundation_concurrent::{ConcurrentError, ConcurrentResult, PhasedBarrier};

/// Runs `workers` threads for `phases` phases over a [`PhasedBarrier`].
///
/// Within a phase every worker runs its share of work, then the last one to
/// arrive runs the phase hook before anyone moves on.
///
/// ```
/// use foundation_testing::scenarios::PhasedWorkers;
/// use std::sync::{Arc, Mutex};
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let hook_log = Arc::clone(&log);
///
/// let phases = PhasedWorkers::new(3, 4)
///     .run(|_worker, _phase| {}, move |phase| {
///         hook_log.lock().unwrap().push(phase);
///         Ok(())
///     })
///     .unwrap();
///
/// assert_eq!(phases, 4);
/// assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PhasedWorkers {
    workers: usize,
    phases: u64,
}

impl PhasedWorkers {
    #[must_use]
    pub const fn new(workers: usize, phases: u64) -> Self {
        Self { workers, phases }
    }

    /// Runs every phase and returns the barrier's final phase number.
    ///
    /// `work(worker, phase)` runs on every worker each phase, `on_phase(phase)`
    /// runs once per phase after all workers arrived.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when there are no workers or too many for a barrier.
    /// - `PostPhase` when `on_phase` fails, every worker stops at that phase.
    ///
    /// # Panics
    ///
    /// Panics when `work` panicked on a worker thread.
    pub fn run<W, P>(&self, work: W, on_phase: P) -> ConcurrentResult<u64>
    where
        W: Fn(usize, u64) + Send + Sync + 'static,
        P: Fn(u64) -> Result<(), BoxedError> + Send + Sync + 'static,
    {
        if self.workers == 0 {
            return Err(ConcurrentError::InvalidArgument(
                "phased workers need at least one worker",
            ));
        }

        let barrier = Arc::new(PhasedBarrier::with_post_phase(self.workers, move |barrier| {
            on_phase(barrier.current_phase_number())
        })?);
        let work = Arc::new(work);
        let phases = self.phases;

        let handles: Vec<_> = (0..self.workers)
            .map(|worker| {
                let barrier = Arc::clone(&barrier);
                let work = Arc::clone(&work);
                thread::spawn(move || -> ConcurrentResult<()> {
                    for phase in 0..phases {
                        work(worker, phase);
                        barrier.signal_and_wait()?;
                    }
                    Ok(())
                })
            })
            .collect();

        let mut outcome = Ok(());
        for handle in handles {
            let joined = handle.join().expect("phased worker panicked");
            if outcome.is_ok() {
                outcome = joined;
            }
        }

        let completed = barrier.current_phase_number();
        barrier.dispose()?;
        tracing::debug!(completed, workers = self.workers, "phased workers finished");

        outcome.map(|()| completed)
    }
}

// Implements a reusable phased rendezvous barrier whose set of participants
// can grow and shrink between phases, with an optional post-phase action run
// by the last arriving thread before everyone is released.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use crate::errors::{
    BoxedError, ConcurrentError, ConcurrentResult, InvalidOperation, PanicError, PostPhaseError,
};
use crate::timeout::{lock, Deadline, WaitTimeout};

/// Upper bound on the participants a single barrier tracks.
pub const MAX_PARTICIPANTS: usize = 32767;

pub type PostPhaseAction =
    Box<dyn Fn(&PhasedBarrier) -> Result<(), BoxedError> + Send + Sync + 'static>;

struct BarrierState {
    participants: usize,
    remaining: usize,
    phase: u64,

    /// Set while the last arrival is running the post-phase action.
    finishing: bool,

    /// The thread running the post-phase action, it may not re-enter.
    action_thread: Option<ThreadId>,

    /// Threads blocked waiting for the current phase to complete.
    waiting: usize,

    /// Failures of finished phases not yet seen by all of their waiters.
    unseen_failures: Vec<UnseenFailure>,
    disposed: bool,
}

struct UnseenFailure {
    failure: PostPhaseError,
    readers: usize,
}

impl BarrierState {
    /// Hands a released waiter the outcome recorded when `phase` finished.
    fn take_outcome(&mut self, phase: u64) -> ConcurrentResult<()> {
        let Some(index) = self
            .unseen_failures
            .iter()
            .position(|entry| entry.failure.phase() == phase)
        else {
            return Ok(());
        };

        let entry = &mut self.unseen_failures[index];
        let failure = entry.failure.clone();
        entry.readers -= 1;
        if entry.readers == 0 {
            self.unseen_failures.swap_remove(index);
        }
        Err(ConcurrentError::PostPhase(failure))
    }
}

/// `PhasedBarrier` blocks a dynamically sized set of participants until all
/// of them have arrived for the current phase, then runs the post-phase
/// action once and releases them together into the next phase.
///
/// ```
/// use foundation_concurrent::barrier::PhasedBarrier;
/// use std::sync::Arc;
/// use std::thread;
///
/// let barrier = Arc::new(PhasedBarrier::new(3).unwrap());
/// let handles: Vec<_> = (0..3)
///     .map(|_| {
///         let barrier = Arc::clone(&barrier);
///         thread::spawn(move || barrier.signal_and_wait())
///     })
///     .collect();
///
/// for handle in handles {
///     handle.join().unwrap().unwrap();
/// }
/// assert_eq!(barrier.current_phase_number(), 1);
/// ```
pub struct PhasedBarrier {
    state: Mutex<BarrierState>,
    released: Condvar,
    post_phase: Option<PostPhaseAction>,
}

// --- constructors

impl PhasedBarrier {
    /// Creates a barrier expecting `participants` arrivals per phase.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `participants` exceeds [`MAX_PARTICIPANTS`].
    pub fn new(participants: usize) -> ConcurrentResult<Self> {
        Self::build(participants, None)
    }

    /// Creates a barrier that runs `action` once at the end of every phase.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `participants` exceeds [`MAX_PARTICIPANTS`].
    pub fn with_post_phase<F>(participants: usize, action: F) -> ConcurrentResult<Self>
    where
        F: Fn(&PhasedBarrier) -> Result<(), BoxedError> + Send + Sync + 'static,
    {
        Self::build(participants, Some(Box::new(action)))
    }

    fn build(participants: usize, post_phase: Option<PostPhaseAction>) -> ConcurrentResult<Self> {
        if participants > MAX_PARTICIPANTS {
            return Err(ConcurrentError::InvalidArgument(
                "participant count exceeds the barrier maximum",
            ));
        }

        Ok(Self {
            state: Mutex::new(BarrierState {
                participants,
                remaining: participants,
                phase: 0,
                finishing: false,
                action_thread: None,
                waiting: 0,
                unseen_failures: Vec::new(),
                disposed: false,
            }),
            released: Condvar::new(),
            post_phase,
        })
    }
}

// --- properties

impl PhasedBarrier {
    #[must_use]
    pub fn participant_count(&self) -> usize {
        lock(&self.state).participants
    }

    #[must_use]
    pub fn participants_remaining(&self) -> usize {
        lock(&self.state).remaining
    }

    #[must_use]
    pub fn current_phase_number(&self) -> u64 {
        lock(&self.state).phase
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        lock(&self.state).disposed
    }
}

// --- core implementation methods

impl PhasedBarrier {
    /// Signals arrival and blocks until every participant of the current
    /// phase has arrived.
    ///
    /// # Errors
    ///
    /// See [`Self::signal_and_wait_timeout`].
    pub fn signal_and_wait(&self) -> ConcurrentResult<()> {
        self.signal_and_wait_timeout(WaitTimeout::Infinite)
            .map(|_| ())
    }

    /// Like [`Self::signal_and_wait_timeout`] with a millisecond timeout
    /// where `-1` waits forever.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for timeouts below `-1`, otherwise see
    /// [`Self::signal_and_wait_timeout`].
    pub fn signal_and_wait_millis(&self, millis: i64) -> ConcurrentResult<bool> {
        self.signal_and_wait_timeout(WaitTimeout::from_millis(millis)?)
    }

    /// Signals arrival and blocks until the phase completes or `timeout`
    /// elapses. A timed out caller withdraws its arrival and gets `Ok(false)`.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` when the barrier has no participants or when
    ///   called from within the post-phase action.
    /// - `ObjectDisposed` when the barrier is, or gets, disposed.
    /// - `PostPhase` when the post-phase action of this phase failed.
    pub fn signal_and_wait_timeout(&self, timeout: WaitTimeout) -> ConcurrentResult<bool> {
        let deadline = timeout.start();

        let mut state = lock(&self.state);
        self.ensure_usable(&state)?;

        // arrivals while a phase is being finished count toward the next one
        while state.finishing {
            let (guard, expired) = deadline.wait(&self.released, state);
            state = guard;
            self.ensure_usable(&state)?;
            if expired && state.finishing {
                return Ok(false);
            }
        }

        if state.participants == 0 {
            return Err(InvalidOperation::ZeroParticipants.into());
        }

        let local_phase = state.phase;
        state.remaining -= 1;

        if state.remaining == 0 {
            return self.finish_phase(state).map(|()| true);
        }

        state.waiting += 1;
        loop {
            // the outcome of a finished phase stands even if disposal followed
            if state.phase != local_phase {
                return state.take_outcome(local_phase).map(|()| true);
            }

            if state.disposed {
                state.waiting -= 1;
                return Err(ConcurrentError::ObjectDisposed("PhasedBarrier"));
            }

            // once finishing starts our arrival is spent, wait it out
            let (guard, expired) = if state.finishing {
                Deadline::never().wait(&self.released, state)
            } else {
                deadline.wait(&self.released, state)
            };
            state = guard;

            if expired && !state.finishing && !state.disposed && state.phase == local_phase {
                state.remaining += 1;
                state.waiting -= 1;
                tracing::trace!(phase = local_phase, "barrier wait timed out, arrival withdrawn");
                return Ok(false);
            }
        }
    }

    /// Adds a single participant, see [`Self::add_participants`].
    ///
    /// # Errors
    ///
    /// See [`Self::add_participants`].
    pub fn add_participant(&self) -> ConcurrentResult<u64> {
        self.add_participants(1)
    }

    /// Adds `count` participants and returns the phase number in which they
    /// first take part.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when `count` is zero or the total would exceed
    ///   [`MAX_PARTICIPANTS`].
    /// - `InvalidOperation` when called from within the post-phase action.
    /// - `ObjectDisposed` once disposed.
    pub fn add_participants(&self, count: usize) -> ConcurrentResult<u64> {
        if count == 0 {
            return Err(ConcurrentError::InvalidArgument(
                "participants to add must be greater than zero",
            ));
        }

        let mut state = lock(&self.state);
        self.ensure_usable(&state)?;

        let total = state
            .participants
            .checked_add(count)
            .filter(|total| *total <= MAX_PARTICIPANTS)
            .ok_or(ConcurrentError::InvalidArgument(
                "adding participants would exceed the barrier maximum",
            ))?;

        state.participants = total;
        tracing::debug!(added = count, total, "barrier participants added");

        if state.finishing {
            // the remaining count is reset from the new total when the phase advances
            return Ok(state.phase + 1);
        }

        state.remaining += count;
        Ok(state.phase)
    }

    /// Removes a single participant, see [`Self::remove_participants`].
    ///
    /// # Errors
    ///
    /// See [`Self::remove_participants`].
    pub fn remove_participant(&self) -> ConcurrentResult<()> {
        self.remove_participants(1)
    }

    /// Removes `count` participants. When every participant left has already
    /// arrived, the calling thread completes the phase.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when `count` is zero, exceeds the participant
    ///   count, or exceeds the participants yet to arrive this phase.
    /// - `InvalidOperation` when called from within the post-phase action.
    /// - `ObjectDisposed` once disposed.
    /// - `PostPhase` when this call completed the phase and the action failed.
    pub fn remove_participants(&self, count: usize) -> ConcurrentResult<()> {
        if count == 0 {
            return Err(ConcurrentError::InvalidArgument(
                "participants to remove must be greater than zero",
            ));
        }

        let mut state = lock(&self.state);
        self.ensure_usable(&state)?;

        if count > state.participants {
            return Err(ConcurrentError::InvalidArgument(
                "removing participants would drive the count below zero",
            ));
        }

        if state.finishing {
            state.participants -= count;
            tracing::debug!(removed = count, total = state.participants, "barrier participants removed");
            return Ok(());
        }

        if count > state.remaining {
            return Err(ConcurrentError::InvalidArgument(
                "cannot remove participants that already signaled this phase",
            ));
        }

        state.participants -= count;
        state.remaining -= count;
        tracing::debug!(removed = count, total = state.participants, "barrier participants removed");

        if state.remaining == 0 && state.participants > 0 {
            return self.finish_phase(state);
        }
        Ok(())
    }

    /// Disposes the barrier, releasing every blocked waiter with
    /// `ObjectDisposed`. Disposing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` when called from within the post-phase action.
    pub fn dispose(&self) -> ConcurrentResult<()> {
        let mut state = lock(&self.state);
        if self.is_action_thread(&state) {
            return Err(InvalidOperation::ReentrantPostPhase.into());
        }
        if state.disposed {
            return Ok(());
        }

        state.disposed = true;
        drop(state);

        tracing::debug!("barrier disposed");
        self.released.notify_all();
        Ok(())
    }

    fn is_action_thread(&self, state: &BarrierState) -> bool {
        state.action_thread == Some(thread::current().id())
    }

    fn ensure_usable(&self, state: &BarrierState) -> ConcurrentResult<()> {
        if self.is_action_thread(state) {
            return Err(InvalidOperation::ReentrantPostPhase.into());
        }
        if state.disposed {
            return Err(ConcurrentError::ObjectDisposed("PhasedBarrier"));
        }
        Ok(())
    }

    /// Runs the post-phase action outside the lock, then advances the phase
    /// and wakes every waiter.
    fn finish_phase<'a>(
        &'a self,
        mut state: MutexGuard<'a, BarrierState>,
    ) -> ConcurrentResult<()> {
        let phase = state.phase;

        let failure = match &self.post_phase {
            Some(action) => {
                state.finishing = true;
                state.action_thread = Some(thread::current().id());
                drop(state);

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| action(self)));
                let failure = match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(err)) => Some(PostPhaseError::new(phase, err)),
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        tracing::warn!(phase, %message, "barrier post-phase action panicked");
                        Some(PostPhaseError::new(phase, Box::new(PanicError(message))))
                    }
                };

                state = lock(&self.state);
                state.finishing = false;
                state.action_thread = None;
                failure
            }
            None => None,
        };

        if let Some(err) = &failure {
            tracing::debug!(phase, error = %err, "barrier post-phase action failed");
        }

        let readers = std::mem::take(&mut state.waiting);
        if let Some(err) = &failure {
            if readers > 0 {
                state.unseen_failures.push(UnseenFailure {
                    failure: err.clone(),
                    readers,
                });
            }
        }
        state.phase += 1;
        state.remaining = state.participants;
        tracing::debug!(phase = state.phase, participants = state.participants, "barrier phase advanced");
        drop(state);

        self.released.notify_all();

        match failure {
            Some(err) => Err(ConcurrentError::PostPhase(err)),
            None => Ok(()),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl fmt::Debug for PhasedBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("PhasedBarrier")
            .field("participants", &state.participants)
            .field("remaining", &state.remaining)
            .field("phase", &state.phase)
            .field("disposed", &state.disposed)
            .field("has_post_phase", &self.post_phase.is_some())
            .finish()
    }
}

//! Timeouts accepted by every blocking operation in this crate.
//!
//! A [`WaitTimeout`] is either infinite or a bounded duration. Millisecond
//! based constructors follow the classic convention where `-1` means
//! "wait forever" and any other negative value is rejected.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::errors::{ConcurrentError, ConcurrentResult};

/// The millisecond sentinel meaning "wait forever".
pub const INFINITE_MILLIS: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitTimeout {
    #[default]
    Infinite,
    After(Duration),
}

impl WaitTimeout {
    /// A zero timeout, the operation polls once and never blocks.
    pub const ZERO: Self = Self::After(Duration::ZERO);

    /// Builds a timeout from milliseconds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for negative values other than
    /// [`INFINITE_MILLIS`] and for values beyond `i32::MAX`.
    pub fn from_millis(millis: i64) -> ConcurrentResult<Self> {
        if millis == INFINITE_MILLIS {
            return Ok(Self::Infinite);
        }
        if millis < INFINITE_MILLIS {
            return Err(ConcurrentError::InvalidArgument(
                "timeout must be -1 (infinite) or a non-negative number of milliseconds",
            ));
        }
        if millis > i64::from(i32::MAX) {
            return Err(ConcurrentError::InvalidArgument(
                "timeout is greater than the maximum representable wait",
            ));
        }
        Ok(Self::After(Duration::from_millis(millis.unsigned_abs())))
    }

    #[must_use]
    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        matches!(self, Self::After(d) if d.is_zero())
    }

    /// Starts the clock, turning this relative timeout into a [`Deadline`].
    #[must_use]
    pub fn start(self) -> Deadline {
        match self {
            Self::Infinite => Deadline { at: None },
            // an unrepresentable instant is as good as forever
            Self::After(dur) => Deadline {
                at: Instant::now().checked_add(dur),
            },
        }
    }
}

impl From<Duration> for WaitTimeout {
    fn from(value: Duration) -> Self {
        Self::After(value)
    }
}

/// `Deadline` is an absolute point in time a blocking operation gives up at.
///
/// Condvar waits are re-armed with [`Deadline::remaining`] so spurious
/// wake-ups never extend the total wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    #[must_use]
    pub fn never() -> Self {
        Self { at: None }
    }

    /// Time left before expiry, `None` when the deadline is infinite.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    #[must_use]
    pub fn has_expired(&self) -> bool {
        matches!(self.remaining(), Some(left) if left.is_zero())
    }

    /// Blocks on `condvar` until notified or until the deadline passes.
    ///
    /// Returns the re-acquired guard and `true` when the deadline had
    /// already expired, in which case no wait happened. Poisoned locks are
    /// recovered since the guarded state never spans user code.
    pub(crate) fn wait<'a, T>(
        &self,
        condvar: &Condvar,
        guard: MutexGuard<'a, T>,
    ) -> (MutexGuard<'a, T>, bool) {
        match self.remaining() {
            None => {
                let guard = match condvar.wait(guard) {
                    Ok(g) => g,
                    Err(e) => e.into_inner(),
                };
                (guard, false)
            }
            Some(left) if left.is_zero() => (guard, true),
            Some(left) => {
                let guard = match condvar.wait_timeout(guard, left) {
                    Ok((g, _)) => g,
                    Err(e) => e.into_inner().0,
                };
                (guard, false)
            }
        }
    }
}

/// Locks `mutex`, recovering the guard from a poisoned lock.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(g) => g,
        Err(e) => e.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_sentinel_maps_to_infinite() {
        assert_eq!(WaitTimeout::from_millis(-1), Ok(WaitTimeout::Infinite));
        assert_eq!(
            WaitTimeout::from_millis(250),
            Ok(WaitTimeout::After(Duration::from_millis(250)))
        );
        assert!(WaitTimeout::from_millis(0).expect("zero is valid").is_zero());
    }

    #[test]
    fn rejects_negative_and_oversized_millis() {
        assert!(WaitTimeout::from_millis(-2)
            .expect_err("negative")
            .is_invalid_argument());
        assert!(WaitTimeout::from_millis(i64::from(i32::MAX) + 1)
            .expect_err("too large")
            .is_invalid_argument());
    }

    #[test]
    fn deadline_expires() {
        let deadline = WaitTimeout::ZERO.start();
        assert!(deadline.has_expired());
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));

        let never = WaitTimeout::Infinite.start();
        assert!(!never.has_expired());
        assert_eq!(never.remaining(), None);
        assert_eq!(never, Deadline::never());
    }
}

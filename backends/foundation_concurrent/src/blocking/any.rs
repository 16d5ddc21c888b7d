// Implements the add/take "any" operations that work against whichever of a
// set of blocking collections can accept or supply an item first.
//
// A waiting caller registers one shared AnySignal with every collection in the
// set. Each add, take, completion or disposal on a member bumps the signal's
// generation, so the caller sleeps on a single condvar instead of polling.

use std::sync::{Arc, Condvar, Mutex};

use super::collection::{BlockingCollection, TryAddResult, TryTakeResult};
use super::containers::ProducerConsumer;
use crate::errors::{ConcurrentError, ConcurrentResult, InvalidOperation};
use crate::timeout::{lock, Deadline, WaitTimeout};

/// Most collections a single any-operation accepts.
pub const MAX_ANY_COLLECTIONS: usize = 63;

#[derive(Debug, Default)]
pub(crate) struct AnySignal {
    generation: Mutex<u64>,
    changed: Condvar,
}

impl AnySignal {
    pub(crate) fn notify(&self) {
        let mut generation = lock(&self.generation);
        *generation = generation.wrapping_add(1);
        drop(generation);
        self.changed.notify_all();
    }

    fn generation(&self) -> u64 {
        *lock(&self.generation)
    }

    /// Sleeps until the generation moves past `seen` or the deadline passes.
    fn wait_past(&self, seen: u64, deadline: &Deadline) {
        let mut generation = lock(&self.generation);
        while *generation == seen && !deadline.has_expired() {
            generation = deadline.wait(&self.changed, generation).0;
        }
    }
}

/// Keeps a signal registered with every collection of a set for as long as
/// it lives.
struct Registration<'a, T, C> {
    collections: &'a [&'a BlockingCollection<T, C>],
    signal: Arc<AnySignal>,
}

impl<'a, T, C> Registration<'a, T, C> {
    fn new(collections: &'a [&'a BlockingCollection<T, C>]) -> Self {
        let signal = Arc::new(AnySignal::default());
        for collection in collections {
            collection.register(&signal);
        }
        Self {
            collections,
            signal,
        }
    }
}

impl<T, C> Drop for Registration<'_, T, C> {
    fn drop(&mut self) {
        for collection in self.collections {
            collection.unregister(&self.signal);
        }
    }
}

fn validate<T, C>(
    collections: &[&BlockingCollection<T, C>],
    is_add: bool,
) -> ConcurrentResult<()> {
    if collections.is_empty() {
        return Err(ConcurrentError::InvalidArgument(
            "collections must hold at least one collection",
        ));
    }
    if collections.len() > MAX_ANY_COLLECTIONS {
        return Err(ConcurrentError::ArgumentOutOfRange(
            "collections holds more than the supported number of collections",
        ));
    }

    for collection in collections {
        let (disposed, adding_completed) = collection.flags();
        if disposed {
            return Err(ConcurrentError::ObjectDisposed("BlockingCollection"));
        }
        if is_add && adding_completed {
            return Err(ConcurrentError::InvalidArgument(
                "collections holds a collection marked as complete for adding",
            ));
        }
    }
    Ok(())
}

/// One non-blocking pass, handing the item back if every collection is full.
fn add_pass<T, C>(
    collections: &[&BlockingCollection<T, C>],
    item: T,
) -> ConcurrentResult<TryAddResult<T, usize>>
where
    C: ProducerConsumer<T>,
{
    let mut item = item;
    for (index, collection) in collections.iter().enumerate() {
        match collection.add_until(item, WaitTimeout::ZERO.start())? {
            TryAddResult::Added(()) => return Ok(TryAddResult::Added(index)),
            TryAddResult::TimedOut(rejected) => item = rejected,
        }
    }
    Ok(TryAddResult::TimedOut(item))
}

/// One non-blocking pass over every collection that can still supply items.
fn take_pass<T, C>(
    collections: &[&BlockingCollection<T, C>],
) -> ConcurrentResult<TryTakeResult<(usize, T)>>
where
    C: ProducerConsumer<T>,
{
    let mut all_drained = true;
    for (index, collection) in collections.iter().enumerate() {
        match collection.take_until(WaitTimeout::ZERO.start())? {
            TryTakeResult::Taken(item) => return Ok(TryTakeResult::Taken((index, item))),
            TryTakeResult::TimedOut => all_drained = false,
            TryTakeResult::Drained => {}
        }
    }

    if all_drained {
        return Ok(TryTakeResult::Drained);
    }
    Ok(TryTakeResult::TimedOut)
}

/// Adds `item` to whichever collection has room first, blocking until one
/// does, and returns its index.
///
/// # Errors
///
/// See [`try_add_to_any`].
pub fn add_to_any<T, C>(collections: &[&BlockingCollection<T, C>], item: T) -> ConcurrentResult<usize>
where
    C: ProducerConsumer<T>,
{
    let mut item = item;
    loop {
        match try_add_to_any(collections, item, WaitTimeout::Infinite)? {
            TryAddResult::Added(index) => return Ok(index),
            TryAddResult::TimedOut(rejected) => item = rejected,
        }
    }
}

/// Like [`try_add_to_any`] with a millisecond timeout where `-1` waits forever.
///
/// # Errors
///
/// Returns `InvalidArgument` for timeouts below `-1`, otherwise see [`try_add_to_any`].
pub fn try_add_to_any_millis<T, C>(
    collections: &[&BlockingCollection<T, C>],
    item: T,
    millis: i64,
) -> ConcurrentResult<TryAddResult<T, usize>>
where
    C: ProducerConsumer<T>,
{
    try_add_to_any(collections, item, WaitTimeout::from_millis(millis)?)
}

/// Adds `item` to whichever collection has room first, waiting up to
/// `timeout`. Reports the index of the accepting collection, or hands the
/// item back on timeout.
///
/// # Errors
///
/// - `InvalidArgument` when `collections` is empty or holds a collection
///   completed for adding.
/// - `ArgumentOutOfRange` when it holds more than [`MAX_ANY_COLLECTIONS`].
/// - `ObjectDisposed` when it holds a disposed collection.
/// - `InvalidOperation` when a member completes or refuses the item mid-wait.
pub fn try_add_to_any<T, C>(
    collections: &[&BlockingCollection<T, C>],
    item: T,
    timeout: WaitTimeout,
) -> ConcurrentResult<TryAddResult<T, usize>>
where
    C: ProducerConsumer<T>,
{
    validate(collections, true)?;

    let deadline = timeout.start();
    let mut item = match add_pass(collections, item)? {
        TryAddResult::TimedOut(item) if !deadline.has_expired() => item,
        outcome => return Ok(outcome),
    };

    let registration = Registration::new(collections);
    loop {
        let seen = registration.signal.generation();
        item = match add_pass(collections, item)? {
            TryAddResult::TimedOut(item) => item,
            added => return Ok(added),
        };

        if deadline.has_expired() {
            tracing::trace!(collections = collections.len(), "add to any timed out");
            return Ok(TryAddResult::TimedOut(item));
        }
        registration.signal.wait_past(seen, &deadline);
    }
}

/// Takes an item from whichever collection supplies one first, blocking
/// until one does.
///
/// # Errors
///
/// Returns `InvalidOperation(AllCollectionsCompleted)` once every collection
/// is completed and empty, otherwise see [`try_take_from_any`].
pub fn take_from_any<T, C>(collections: &[&BlockingCollection<T, C>]) -> ConcurrentResult<(usize, T)>
where
    C: ProducerConsumer<T>,
{
    loop {
        match try_take_from_any(collections, WaitTimeout::Infinite)? {
            TryTakeResult::Taken(taken) => return Ok(taken),
            TryTakeResult::Drained => {
                return Err(InvalidOperation::AllCollectionsCompleted.into());
            }
            TryTakeResult::TimedOut => {}
        }
    }
}

/// Like [`try_take_from_any`] with a millisecond timeout where `-1` waits forever.
///
/// # Errors
///
/// Returns `InvalidArgument` for timeouts below `-1`, otherwise see [`try_take_from_any`].
pub fn try_take_from_any_millis<T, C>(
    collections: &[&BlockingCollection<T, C>],
    millis: i64,
) -> ConcurrentResult<TryTakeResult<(usize, T)>>
where
    C: ProducerConsumer<T>,
{
    try_take_from_any(collections, WaitTimeout::from_millis(millis)?)
}

/// Takes an item from whichever collection supplies one first, waiting up
/// to `timeout`. Completed and empty collections are skipped, when all of
/// them are the result is [`TryTakeResult::Drained`].
///
/// # Errors
///
/// - `InvalidArgument` when `collections` is empty.
/// - `ArgumentOutOfRange` when it holds more than [`MAX_ANY_COLLECTIONS`].
/// - `ObjectDisposed` when it holds, or a member becomes, a disposed collection.
pub fn try_take_from_any<T, C>(
    collections: &[&BlockingCollection<T, C>],
    timeout: WaitTimeout,
) -> ConcurrentResult<TryTakeResult<(usize, T)>>
where
    C: ProducerConsumer<T>,
{
    validate(collections, false)?;

    let deadline = timeout.start();
    match take_pass(collections)? {
        TryTakeResult::TimedOut if !deadline.has_expired() => {}
        outcome => return Ok(outcome),
    }

    let registration = Registration::new(collections);
    loop {
        let seen = registration.signal.generation();
        match take_pass(collections)? {
            TryTakeResult::TimedOut => {}
            outcome => return Ok(outcome),
        }

        if deadline.has_expired() {
            tracing::trace!(collections = collections.len(), "take from any timed out");
            return Ok(TryTakeResult::TimedOut);
        }
        registration.signal.wait_past(seen, &deadline);
    }
}

// Implements a blocking producer/consumer collection around a pluggable
// ProducerConsumer container, with an optional capacity bound, completion
// signalling and explicit disposal.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use super::any::AnySignal;
use super::containers::{ConcurrentQueue, ProducerConsumer};
use super::iter::{ConsumingIter, SnapshotIter};
use crate::config::BlockingConfig;
use crate::errors::{ConcurrentError, ConcurrentResult, InvalidOperation};
use crate::timeout::{lock, Deadline, WaitTimeout};

/// Outcome of a timed add. `I` is what a successful add reports, the
/// index of the accepting collection for the any-variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryAddResult<T, I = ()> {
    Added(I),

    /// The wait elapsed before room freed up, the item is handed back.
    TimedOut(T),
}

impl<T, I> TryAddResult<T, I> {
    #[must_use]
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }

    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    /// What the successful add reported, `None` on timeout.
    #[must_use]
    pub fn added(self) -> Option<I> {
        match self {
            Self::Added(value) => Some(value),
            Self::TimedOut(_) => None,
        }
    }

    /// The item handed back by a timed out add.
    #[must_use]
    pub fn into_rejected(self) -> Option<T> {
        match self {
            Self::Added(_) => None,
            Self::TimedOut(item) => Some(item),
        }
    }
}

/// Outcome of a timed take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryTakeResult<T> {
    Taken(T),

    /// The wait elapsed while the collection was empty.
    TimedOut,

    /// Adding is completed and the collection is empty, nothing will ever
    /// arrive again.
    Drained,
}

impl<T> TryTakeResult<T> {
    #[must_use]
    pub fn is_taken(&self) -> bool {
        matches!(self, Self::Taken(_))
    }

    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    #[must_use]
    pub fn is_drained(&self) -> bool {
        matches!(self, Self::Drained)
    }

    #[must_use]
    pub fn into_item(self) -> Option<T> {
        match self {
            Self::Taken(item) => Some(item),
            Self::TimedOut | Self::Drained => None,
        }
    }
}

pub(crate) struct CollectionState {
    count: usize,
    adding_completed: bool,
    disposed: bool,

    /// Signals of any-operations currently waiting on this collection.
    observers: Vec<Arc<AnySignal>>,
}

impl CollectionState {
    fn notify_observers(&self) {
        for observer in &self.observers {
            observer.notify();
        }
    }
}

/// `BlockingCollection` wraps a [`ProducerConsumer`] container and makes
/// producers wait while it is full and consumers wait while it is empty.
///
/// ```
/// use foundation_concurrent::blocking::BlockingCollection;
///
/// let collection = BlockingCollection::<i32>::new();
/// collection.add(1).unwrap();
/// collection.add(2).unwrap();
/// collection.complete_adding().unwrap();
///
/// let drained: Vec<i32> = collection.consuming_iter().unwrap().collect();
/// assert_eq!(drained, vec![1, 2]);
/// assert!(collection.is_completed().unwrap());
/// ```
pub struct BlockingCollection<T, C = ConcurrentQueue<T>> {
    container: C,
    bounded_capacity: Option<usize>,
    state: Mutex<CollectionState>,
    not_empty: Condvar,
    not_full: Condvar,
    _items: PhantomData<fn(T) -> T>,
}

// --- constructors

impl<T> Default for BlockingCollection<T>
where
    T: Send,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> BlockingCollection<T, C>
where
    C: ProducerConsumer<T> + Default,
{
    /// Creates an unbounded collection over a default container.
    #[must_use]
    pub fn new() -> Self {
        Self::with_container(C::default())
    }

    /// Creates a collection holding at most `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `capacity` is zero.
    pub fn bounded(capacity: usize) -> ConcurrentResult<Self> {
        Self::bounded_with_container(C::default(), capacity)
    }

    /// Creates a collection from configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the configured capacity is zero.
    pub fn from_config(config: &BlockingConfig) -> ConcurrentResult<Self> {
        match config.bounded_capacity {
            Some(capacity) => Self::bounded(capacity),
            None => Ok(Self::new()),
        }
    }
}

impl<T, C> BlockingCollection<T, C>
where
    C: ProducerConsumer<T>,
{
    /// Wraps `container` without a capacity bound. Items already in the
    /// container are takeable.
    #[must_use]
    pub fn with_container(container: C) -> Self {
        Self::build(container, None)
    }

    /// Wraps `container`, bounding it to `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `capacity` is zero or the container
    /// already holds more than `capacity` items.
    pub fn bounded_with_container(container: C, capacity: usize) -> ConcurrentResult<Self> {
        if capacity == 0 {
            return Err(ConcurrentError::InvalidArgument(
                "bounded capacity must be greater than zero",
            ));
        }
        if container.len() > capacity {
            return Err(ConcurrentError::InvalidArgument(
                "container already holds more items than the bounded capacity",
            ));
        }
        Ok(Self::build(container, Some(capacity)))
    }

    fn build(container: C, bounded_capacity: Option<usize>) -> Self {
        let count = container.len();
        Self {
            container,
            bounded_capacity,
            state: Mutex::new(CollectionState {
                count,
                adding_completed: false,
                disposed: false,
                observers: Vec::new(),
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            _items: PhantomData,
        }
    }
}

// --- properties

impl<T, C> BlockingCollection<T, C>
where
    C: ProducerConsumer<T>,
{
    /// # Errors
    ///
    /// Returns `ObjectDisposed` once disposed.
    pub fn count(&self) -> ConcurrentResult<usize> {
        Ok(self.open_state()?.count)
    }

    /// The capacity bound, `None` for unbounded collections.
    ///
    /// # Errors
    ///
    /// Returns `ObjectDisposed` once disposed.
    pub fn bounded_capacity(&self) -> ConcurrentResult<Option<usize>> {
        drop(self.open_state()?);
        Ok(self.bounded_capacity)
    }

    /// # Errors
    ///
    /// Returns `ObjectDisposed` once disposed.
    pub fn is_adding_completed(&self) -> ConcurrentResult<bool> {
        Ok(self.open_state()?.adding_completed)
    }

    /// True once adding is completed and every item has been taken.
    ///
    /// # Errors
    ///
    /// Returns `ObjectDisposed` once disposed.
    pub fn is_completed(&self) -> ConcurrentResult<bool> {
        let state = self.open_state()?;
        Ok(state.adding_completed && state.count == 0)
    }

    /// Legacy synchronisation root, never supported.
    ///
    /// # Errors
    ///
    /// Always returns `NotSupported`, disposed or not.
    pub fn sync_root(&self) -> ConcurrentResult<()> {
        Err(ConcurrentError::NotSupported("SyncRoot"))
    }

    /// Legacy synchronisation flag, never supported.
    ///
    /// # Errors
    ///
    /// Always returns `NotSupported`, disposed or not.
    pub fn is_synchronized(&self) -> ConcurrentResult<bool> {
        Err(ConcurrentError::NotSupported("IsSynchronized"))
    }

    fn open_state(&self) -> ConcurrentResult<MutexGuard<'_, CollectionState>> {
        let state = lock(&self.state);
        if state.disposed {
            return Err(ConcurrentError::ObjectDisposed("BlockingCollection"));
        }
        Ok(state)
    }

    fn has_room(&self, state: &CollectionState) -> bool {
        self.bounded_capacity
            .map_or(true, |capacity| state.count < capacity)
    }
}

// --- core implementation methods

impl<T, C> BlockingCollection<T, C>
where
    C: ProducerConsumer<T>,
{
    /// Adds `item`, blocking while the collection is full.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation(AddingCompleted)` once adding is completed.
    /// - `InvalidOperation(ContainerRefused)` when the container declines the item.
    /// - `ObjectDisposed` when the collection is, or gets, disposed.
    pub fn add(&self, item: T) -> ConcurrentResult<()> {
        let mut item = item;
        loop {
            match self.try_add(item, WaitTimeout::Infinite)? {
                TryAddResult::Added(()) => return Ok(()),
                TryAddResult::TimedOut(rejected) => item = rejected,
            }
        }
    }

    /// Like [`Self::try_add`] with a millisecond timeout where `-1` waits forever.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for timeouts below `-1`, otherwise see [`Self::add`].
    pub fn try_add_millis(&self, item: T, millis: i64) -> ConcurrentResult<TryAddResult<T>> {
        self.try_add(item, WaitTimeout::from_millis(millis)?)
    }

    /// Adds `item`, waiting up to `timeout` for room. A timed out add
    /// hands the item back.
    ///
    /// # Errors
    ///
    /// See [`Self::add`].
    pub fn try_add(&self, item: T, timeout: WaitTimeout) -> ConcurrentResult<TryAddResult<T>> {
        self.add_until(item, timeout.start())
    }

    pub(crate) fn add_until(&self, item: T, deadline: Deadline) -> ConcurrentResult<TryAddResult<T>> {
        let mut state = self.open_state()?;
        loop {
            if state.adding_completed {
                return Err(InvalidOperation::AddingCompleted.into());
            }

            if self.has_room(&state) {
                return match self.container.try_add(item) {
                    Ok(()) => {
                        state.count += 1;
                        state.notify_observers();
                        drop(state);
                        self.not_empty.notify_one();
                        Ok(TryAddResult::Added(()))
                    }
                    Err(_) => Err(InvalidOperation::ContainerRefused.into()),
                };
            }

            if deadline.has_expired() {
                tracing::trace!("blocking add timed out on a full collection");
                return Ok(TryAddResult::TimedOut(item));
            }

            state = deadline.wait(&self.not_full, state).0;
            if state.disposed {
                return Err(ConcurrentError::ObjectDisposed("BlockingCollection"));
            }
        }
    }

    /// Takes an item, blocking while the collection is empty.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation(NoMoreItems)` once adding is completed and the
    ///   collection is empty.
    /// - `ObjectDisposed` when the collection is, or gets, disposed.
    pub fn take(&self) -> ConcurrentResult<T> {
        loop {
            match self.try_take(WaitTimeout::Infinite)? {
                TryTakeResult::Taken(item) => return Ok(item),
                TryTakeResult::Drained => return Err(InvalidOperation::NoMoreItems.into()),
                TryTakeResult::TimedOut => continue,
            }
        }
    }

    /// Like [`Self::try_take`] with a millisecond timeout where `-1` waits forever.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for timeouts below `-1`, otherwise `ObjectDisposed`.
    pub fn try_take_millis(&self, millis: i64) -> ConcurrentResult<TryTakeResult<T>> {
        self.try_take(WaitTimeout::from_millis(millis)?)
    }

    /// Takes an item, waiting up to `timeout` for one to arrive.
    ///
    /// A completed and empty collection reports [`TryTakeResult::Drained`]
    /// without waiting.
    ///
    /// # Errors
    ///
    /// Returns `ObjectDisposed` when the collection is, or gets, disposed.
    pub fn try_take(&self, timeout: WaitTimeout) -> ConcurrentResult<TryTakeResult<T>> {
        self.take_until(timeout.start())
    }

    pub(crate) fn take_until(&self, deadline: Deadline) -> ConcurrentResult<TryTakeResult<T>> {
        let mut state = self.open_state()?;
        loop {
            if state.count > 0 {
                if let Some(item) = self.container.try_take() {
                    state.count -= 1;
                    state.notify_observers();
                    drop(state);
                    self.not_full.notify_one();
                    return Ok(TryTakeResult::Taken(item));
                }

                tracing::warn!(
                    count = state.count,
                    "backing container reported items it could not hand out"
                );
                state.count = self.container.len().min(state.count - 1);
                continue;
            }

            if state.adding_completed {
                return Ok(TryTakeResult::Drained);
            }

            if deadline.has_expired() {
                tracing::trace!("blocking take timed out on an empty collection");
                return Ok(TryTakeResult::TimedOut);
            }

            state = deadline.wait(&self.not_empty, state).0;
            if state.disposed {
                return Err(ConcurrentError::ObjectDisposed("BlockingCollection"));
            }
        }
    }

    /// Marks the collection as not accepting any more items. Blocked
    /// producers fail and consumers of an empty collection are released.
    /// Completing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ObjectDisposed` once disposed.
    pub fn complete_adding(&self) -> ConcurrentResult<()> {
        let mut state = self.open_state()?;
        if state.adding_completed {
            return Ok(());
        }

        state.adding_completed = true;
        state.notify_observers();
        tracing::debug!(count = state.count, "blocking collection completed for adding");
        drop(state);

        self.not_full.notify_all();
        self.not_empty.notify_all();
        Ok(())
    }

    /// Disposes the collection. Every blocked producer and consumer wakes
    /// with `ObjectDisposed`. Disposing twice is a no-op.
    pub fn dispose(&self) {
        let mut state = lock(&self.state);
        if state.disposed {
            return;
        }

        state.disposed = true;
        state.notify_observers();
        drop(state);

        tracing::debug!("blocking collection disposed");
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Copies the current items into a new vector, in the container's order.
    ///
    /// # Errors
    ///
    /// Returns `ObjectDisposed` once disposed.
    pub fn to_vec(&self) -> ConcurrentResult<Vec<T>>
    where
        T: Clone,
    {
        let state = self.open_state()?;
        let items = self.container.to_vec();
        drop(state);
        Ok(items)
    }

    /// Copies the current items into `destination` starting at `index`.
    ///
    /// # Errors
    ///
    /// - `ArgumentOutOfRange` when `index` is past the end of `destination`.
    /// - `InvalidArgument` when the items do not fit after `index`.
    /// - `ObjectDisposed` once disposed.
    pub fn copy_to(&self, destination: &mut [T], index: usize) -> ConcurrentResult<()>
    where
        T: Clone,
    {
        let items = self.to_vec()?;
        if index > destination.len() {
            return Err(ConcurrentError::ArgumentOutOfRange(
                "index is past the end of the destination",
            ));
        }
        if destination.len() - index < items.len() {
            return Err(ConcurrentError::InvalidArgument(
                "destination is too small to hold the collection",
            ));
        }

        destination[index..index + items.len()].clone_from_slice(&items);
        Ok(())
    }

    /// A point-in-time copy of the items that does not consume them.
    ///
    /// # Errors
    ///
    /// Returns `ObjectDisposed` once disposed.
    pub fn snapshot_iter(&self) -> ConcurrentResult<SnapshotIter<T>>
    where
        T: Clone,
    {
        Ok(SnapshotIter::new(self.to_vec()?))
    }

    /// An iterator that takes items until the collection is completed.
    /// Each call hands out a fresh iterator.
    ///
    /// # Errors
    ///
    /// Returns `ObjectDisposed` once disposed.
    pub fn consuming_iter(&self) -> ConcurrentResult<ConsumingIter<'_, T, C>> {
        drop(self.open_state()?);
        Ok(ConsumingIter::new(self))
    }
}

// --- any-operation plumbing

impl<T, C> BlockingCollection<T, C> {
    pub(crate) fn register(&self, signal: &Arc<AnySignal>) {
        lock(&self.state).observers.push(Arc::clone(signal));
    }

    pub(crate) fn unregister(&self, signal: &Arc<AnySignal>) {
        lock(&self.state)
            .observers
            .retain(|observer| !Arc::ptr_eq(observer, signal));
    }

    /// Disposal and adding-completed flags, read together.
    pub(crate) fn flags(&self) -> (bool, bool) {
        let state = lock(&self.state);
        (state.disposed, state.adding_completed)
    }

    #[cfg(test)]
    pub(crate) fn observer_count(&self) -> usize {
        lock(&self.state).observers.len()
    }
}

impl<T, C> fmt::Debug for BlockingCollection<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("BlockingCollection")
            .field("count", &state.count)
            .field("bounded_capacity", &self.bounded_capacity)
            .field("adding_completed", &state.adding_completed)
            .field("disposed", &state.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::{ConcurrentBag, ConcurrentStack};
    use std::thread;
    use std::time::Duration;
    use tracing_test::traced_test;

    /// Refuses any item it has already seen.
    #[derive(Default)]
    struct UniqueQueue {
        items: Mutex<Vec<i32>>,
    }

    impl ProducerConsumer<i32> for UniqueQueue {
        fn try_add(&self, item: i32) -> Result<(), i32> {
            let mut items = lock(&self.items);
            if items.contains(&item) {
                return Err(item);
            }
            items.push(item);
            Ok(())
        }

        fn try_take(&self) -> Option<i32> {
            let mut items = lock(&self.items);
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        }

        fn len(&self) -> usize {
            lock(&self.items).len()
        }

        fn to_vec(&self) -> Vec<i32> {
            lock(&self.items).clone()
        }
    }

    #[test]
    #[traced_test]
    fn default_collection_is_fifo() {
        let collection = BlockingCollection::<usize>::new();
        for i in 0..10 {
            collection.add(i).expect("unbounded add");
        }
        let taken: Vec<usize> = (0..10).map(|_| collection.take().expect("item")).collect();
        assert_eq!(taken, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn stack_backed_collection_is_lifo() {
        let collection = BlockingCollection::<i32, _>::with_container(ConcurrentStack::new());
        for i in 0..3 {
            collection.add(i).expect("add");
        }
        assert_eq!(collection.to_vec().expect("snapshot"), vec![2, 1, 0]);
        assert_eq!(collection.take().expect("item"), 2);
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = BlockingCollection::<i32>::bounded(0).expect_err("zero capacity");
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn rejects_container_larger_than_bound() {
        let bag: ConcurrentBag<i32> = (0..5).collect();
        let err = BlockingCollection::<i32, _>::bounded_with_container(bag, 4).expect_err("over bound");
        assert!(err.is_invalid_argument());

        let bag: ConcurrentBag<i32> = (0..4).collect();
        let collection =
            BlockingCollection::<i32, _>::bounded_with_container(bag, 4).expect("fits");
        assert_eq!(collection.count(), Ok(4));
    }

    #[test]
    fn full_collection_times_out_and_returns_item() {
        let collection = BlockingCollection::<i32>::bounded(1).expect("valid");
        collection.add(1).expect("room for one");

        let result = collection
            .try_add(2, Duration::from_millis(10).into())
            .expect("timeout is not an error");
        assert_eq!(result.into_rejected(), Some(2));
        assert_eq!(collection.count(), Ok(1));
    }

    #[test]
    fn empty_collection_times_out_then_drains() {
        let collection = BlockingCollection::<i32>::new();
        assert_eq!(collection.try_take(WaitTimeout::ZERO), Ok(TryTakeResult::TimedOut));

        collection.complete_adding().expect("complete");
        assert_eq!(collection.try_take(WaitTimeout::Infinite), Ok(TryTakeResult::Drained));
        assert_eq!(
            collection.take().expect_err("drained").invalid_operation(),
            Some(InvalidOperation::NoMoreItems)
        );
    }

    #[test]
    fn add_after_completion_fails() {
        let collection = BlockingCollection::<i32>::new();
        collection.add(1).expect("add");
        collection.complete_adding().expect("complete");
        collection.complete_adding().expect("complete is idempotent");

        let err = collection.add(2).expect_err("completed");
        assert_eq!(err.invalid_operation(), Some(InvalidOperation::AddingCompleted));
        let err = collection.try_add(2, WaitTimeout::ZERO).expect_err("completed");
        assert_eq!(err.invalid_operation(), Some(InvalidOperation::AddingCompleted));

        assert_eq!(collection.is_completed(), Ok(false));
        assert_eq!(collection.take(), Ok(1));
        assert_eq!(collection.is_completed(), Ok(true));
    }

    #[test]
    fn refused_item_is_an_invalid_operation() {
        let collection = BlockingCollection::<i32, _>::with_container(UniqueQueue::default());
        collection.add(7).expect("first add");

        let err = collection.add(7).expect_err("duplicate refused");
        assert_eq!(err.invalid_operation(), Some(InvalidOperation::ContainerRefused));
        assert_eq!(collection.count(), Ok(1));
    }

    #[test]
    fn invalid_millis_are_rejected() {
        let collection = BlockingCollection::<i32>::new();
        assert!(collection.try_add_millis(1, -2).expect_err("bad").is_invalid_argument());
        assert!(collection.try_take_millis(-5).expect_err("bad").is_invalid_argument());
        assert_eq!(collection.try_take_millis(0), Ok(TryTakeResult::TimedOut));
    }

    #[test]
    fn copy_to_validates_destination() {
        let collection = BlockingCollection::<i32>::new();
        for i in 0..3 {
            collection.add(i).expect("add");
        }

        let mut destination = [0; 5];
        collection.copy_to(&mut destination, 2).expect("fits");
        assert_eq!(destination, [0, 0, 0, 1, 2]);

        assert!(collection.copy_to(&mut destination, 6).expect_err("past end").is_out_of_range());
        assert!(collection.copy_to(&mut destination, 3).expect_err("too small").is_invalid_argument());
    }

    #[test]
    fn completion_releases_blocked_consumer() {
        let collection = Arc::new(BlockingCollection::<i32>::new());

        let consumer = {
            let collection = Arc::clone(&collection);
            thread::spawn(move || collection.take())
        };

        thread::sleep(Duration::from_millis(20));
        collection.complete_adding().expect("complete");

        let err = consumer.join().expect("join").expect_err("nothing arrives");
        assert_eq!(err.invalid_operation(), Some(InvalidOperation::NoMoreItems));
    }

    #[test]
    fn blocked_producer_resumes_when_room_frees() {
        let collection = Arc::new(BlockingCollection::<i32>::bounded(1).expect("valid"));
        collection.add(1).expect("first");

        let producer = {
            let collection = Arc::clone(&collection);
            thread::spawn(move || collection.add(2))
        };

        thread::sleep(Duration::from_millis(20));
        assert_eq!(collection.take(), Ok(1));
        producer.join().expect("join").expect("second add lands");
        assert_eq!(collection.take(), Ok(2));
    }

    #[test]
    fn dispose_fails_every_member() {
        let collection = BlockingCollection::<i32>::new();
        collection.dispose();
        collection.dispose();

        assert!(collection.add(1).expect_err("disposed").is_disposed());
        assert!(collection.try_add(1, WaitTimeout::ZERO).expect_err("disposed").is_disposed());
        assert!(collection.take().expect_err("disposed").is_disposed());
        assert!(collection.try_take(WaitTimeout::ZERO).expect_err("disposed").is_disposed());
        assert!(collection.complete_adding().expect_err("disposed").is_disposed());
        assert!(collection.to_vec().expect_err("disposed").is_disposed());
        assert!(collection.copy_to(&mut [0; 2], 0).expect_err("disposed").is_disposed());
        assert!(collection.count().expect_err("disposed").is_disposed());
        assert!(collection.bounded_capacity().expect_err("disposed").is_disposed());
        assert!(collection.is_completed().expect_err("disposed").is_disposed());
        assert!(collection.is_adding_completed().expect_err("disposed").is_disposed());
        assert!(collection.snapshot_iter().expect_err("disposed").is_disposed());
        assert!(collection.consuming_iter().expect_err("disposed").is_disposed());

        assert!(collection.sync_root().expect_err("unsupported").is_not_supported());
        assert!(collection.is_synchronized().expect_err("unsupported").is_not_supported());
    }

    #[test]
    fn dispose_wakes_blocked_consumer() {
        let collection = Arc::new(BlockingCollection::<i32>::new());

        let consumer = {
            let collection = Arc::clone(&collection);
            thread::spawn(move || collection.take())
        };

        thread::sleep(Duration::from_millis(20));
        collection.dispose();

        assert!(consumer.join().expect("join").expect_err("disposed").is_disposed());
    }
}

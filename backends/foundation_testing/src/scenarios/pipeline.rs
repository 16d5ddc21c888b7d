//! A single producer/consumer pipeline stage.

use std::sync::Arc;
use std::thread;

use foundation_concurrent::{BlockingCollection, ConcurrentError, ConcurrentResult};

/// A bounded stage drained by a fixed set of consumer threads.
///
/// ```
/// use foundation_testing::scenarios::Pipeline;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let total = Arc::new(AtomicUsize::new(0));
/// let sum = Arc::clone(&total);
/// let pipeline = Pipeline::new(4, 2, move |item: usize| {
///     sum.fetch_add(item, Ordering::SeqCst);
/// })
/// .unwrap();
///
/// for i in 1..=10 {
///     pipeline.push(i).unwrap();
/// }
///
/// assert_eq!(pipeline.finish().unwrap(), 10);
/// assert_eq!(total.load(Ordering::SeqCst), 55);
/// ```
pub struct Pipeline<T> {
    stage: Arc<BlockingCollection<T>>,
    consumers: Vec<thread::JoinHandle<ConcurrentResult<usize>>>,
}

impl<T> Pipeline<T>
where
    T: Send + 'static,
{
    /// Starts `consumers` threads handing every item to `handler`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `capacity` or `consumers` is zero.
    pub fn new<F>(capacity: usize, consumers: usize, handler: F) -> ConcurrentResult<Self>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        if consumers == 0 {
            return Err(ConcurrentError::InvalidArgument(
                "a pipeline needs at least one consumer",
            ));
        }

        let stage = Arc::new(BlockingCollection::bounded(capacity)?);
        let handler = Arc::new(handler);
        let consumers = (0..consumers)
            .map(|_| {
                let stage = Arc::clone(&stage);
                let handler = Arc::clone(&handler);
                thread::spawn(move || {
                    let mut items = stage.consuming_iter()?;
                    let mut handled = 0;
                    for item in items.by_ref() {
                        handler(item);
                        handled += 1;
                    }
                    match items.error() {
                        Some(err) => Err(err.clone()),
                        None => Ok(handled),
                    }
                })
            })
            .collect();

        Ok(Self { stage, consumers })
    }

    /// Hands `item` to the stage, blocking while it is full.
    ///
    /// # Errors
    ///
    /// Fails once the pipeline is finished.
    pub fn push(&self, item: T) -> ConcurrentResult<()> {
        self.stage.add(item)
    }

    /// The stage itself, for producers running on other threads.
    #[must_use]
    pub fn stage(&self) -> Arc<BlockingCollection<T>> {
        Arc::clone(&self.stage)
    }

    /// Stops accepting items, waits for the consumers to drain the stage and
    /// returns how many items they handled.
    ///
    /// # Errors
    ///
    /// Returns the first error a consumer stopped on.
    ///
    /// # Panics
    ///
    /// Panics when the handler panicked on a consumer thread.
    pub fn finish(self) -> ConcurrentResult<usize> {
        self.stage.complete_adding()?;

        let mut handled = 0;
        for consumer in self.consumers {
            handled += consumer.join().expect("pipeline consumer panicked")?;
        }
        tracing::debug!(handled, "pipeline drained");
        Ok(handled)
    }
}

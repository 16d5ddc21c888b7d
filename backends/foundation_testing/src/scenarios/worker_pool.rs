//! Fixed-size worker pool fed from a blocking collection.

use std::sync::Arc;
use std::thread;

use foundation_concurrent::{BlockingCollection, ConcurrentError, ConcurrentResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A pool of threads taking jobs from a shared [`BlockingCollection`].
///
/// Dropping the pool stops intake and waits for every queued job to run.
///
/// ```
/// use foundation_testing::scenarios::WorkerPool;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let pool = WorkerPool::new(4).unwrap();
/// let counter = Arc::new(AtomicUsize::new(0));
///
/// for _ in 0..10 {
///     let counter = Arc::clone(&counter);
///     pool.execute(move || {
///         counter.fetch_add(1, Ordering::Relaxed);
///     })
///     .unwrap();
/// }
///
/// drop(pool);
/// assert_eq!(counter.load(Ordering::Relaxed), 10);
/// ```
pub struct WorkerPool {
    workers: Vec<thread::JoinHandle<()>>,
    jobs: Arc<BlockingCollection<Job>>,
}

impl WorkerPool {
    /// Starts `size` workers over an unbounded job queue.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `size` is zero.
    pub fn new(size: usize) -> ConcurrentResult<Self> {
        Self::spawn(size, BlockingCollection::new())
    }

    /// Starts `size` workers over a queue holding at most `backlog` jobs,
    /// [`WorkerPool::execute`] blocks while it is full.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `size` or `backlog` is zero.
    pub fn with_backlog(size: usize, backlog: usize) -> ConcurrentResult<Self> {
        Self::spawn(size, BlockingCollection::bounded(backlog)?)
    }

    fn spawn(size: usize, jobs: BlockingCollection<Job>) -> ConcurrentResult<Self> {
        if size == 0 {
            return Err(ConcurrentError::InvalidArgument(
                "a worker pool needs at least one worker",
            ));
        }

        let jobs = Arc::new(jobs);
        let workers = (0..size)
            .map(|id| {
                let jobs = Arc::clone(&jobs);
                thread::spawn(move || {
                    while let Ok(job) = jobs.take() {
                        job();
                    }
                    tracing::trace!(worker = id, "worker pool thread exiting");
                })
            })
            .collect();

        Ok(Self { workers, jobs })
    }

    /// Queues `job` for the next free worker.
    ///
    /// # Errors
    ///
    /// Fails once the pool is shutting down.
    pub fn execute<F>(&self, job: F) -> ConcurrentResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.jobs.add(Box::new(job))
    }

    /// Jobs waiting for a worker.
    ///
    /// # Errors
    ///
    /// Returns `ObjectDisposed` once the queue is gone.
    pub fn pending(&self) -> ConcurrentResult<usize> {
        self.jobs.count()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Err(err) = self.jobs.complete_adding() {
            tracing::warn!(error = %err, "worker pool queue already gone");
        }

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("worker pool job panicked");
            }
        }
    }
}

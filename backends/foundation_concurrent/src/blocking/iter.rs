use std::fmt;
use std::iter::FusedIterator;

use super::collection::{BlockingCollection, TryTakeResult};
use super::containers::ProducerConsumer;
use crate::errors::ConcurrentError;
use crate::timeout::WaitTimeout;

/// Iterator over a point-in-time copy of a blocking collection. Later adds
/// and takes are not reflected.
#[derive(Debug, Clone)]
pub struct SnapshotIter<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> SnapshotIter<T> {
    pub(crate) fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl<T> Iterator for SnapshotIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl<T> ExactSizeIterator for SnapshotIter<T> {}

impl<T> FusedIterator for SnapshotIter<T> {}

/// `ConsumingIter` takes items out of a blocking collection, blocking while
/// it is empty, until the collection is completed.
///
/// When the collection is disposed mid-iteration the iterator ends and the
/// failure is kept in [`ConsumingIter::error`].
pub struct ConsumingIter<'a, T, C>
where
    C: ProducerConsumer<T>,
{
    collection: &'a BlockingCollection<T, C>,
    error: Option<ConcurrentError>,
    finished: bool,
}

impl<'a, T, C> ConsumingIter<'a, T, C>
where
    C: ProducerConsumer<T>,
{
    pub(crate) fn new(collection: &'a BlockingCollection<T, C>) -> Self {
        Self {
            collection,
            error: None,
            finished: false,
        }
    }

    /// The error that ended iteration early, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ConcurrentError> {
        self.error.as_ref()
    }
}

impl<T, C> fmt::Debug for ConsumingIter<'_, T, C>
where
    C: ProducerConsumer<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumingIter")
            .field("collection", self.collection)
            .field("error", &self.error)
            .field("finished", &self.finished)
            .finish()
    }
}

impl<T, C> Iterator for ConsumingIter<'_, T, C>
where
    C: ProducerConsumer<T>,
{
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.collection.try_take(WaitTimeout::Infinite) {
                Ok(TryTakeResult::Taken(item)) => return Some(item),
                Ok(TryTakeResult::TimedOut) => {}
                Ok(TryTakeResult::Drained) => self.finished = true,
                Err(err) => {
                    tracing::debug!(error = %err, "consuming iteration stopped");
                    self.error = Some(err);
                    self.finished = true;
                }
            }
        }
        None
    }
}

impl<T, C> FusedIterator for ConsumingIter<'_, T, C> where C: ProducerConsumer<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn snapshot_does_not_consume() {
        let collection = BlockingCollection::<i32>::new();
        for i in 0..3 {
            collection.add(i).expect("add");
        }

        let snapshot = collection.snapshot_iter().expect("snapshot");
        assert_eq!(snapshot.len(), 3);
        collection.add(3).expect("add after snapshot");

        assert_eq!(snapshot.collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(collection.count(), Ok(4));
    }

    #[test]
    fn consuming_iter_on_completed_empty_collection_yields_nothing() {
        let collection = BlockingCollection::<i32>::new();
        collection.complete_adding().expect("complete");

        assert_eq!(collection.consuming_iter().expect("iter").count(), 0);
        // a fresh iterator can be requested again
        assert_eq!(collection.consuming_iter().expect("iter").count(), 0);
    }

    #[test]
    fn consuming_iter_drains_until_completion() {
        let collection = Arc::new(BlockingCollection::<i32>::bounded(2).expect("valid"));

        let producer = {
            let collection = Arc::clone(&collection);
            thread::spawn(move || {
                for i in 0..10 {
                    collection.add(i).expect("add");
                }
                collection.complete_adding().expect("complete");
            })
        };

        let consumed: Vec<i32> = collection.consuming_iter().expect("iter").collect();
        producer.join().expect("join");

        assert_eq!(consumed, (0..10).collect::<Vec<_>>());
        assert_eq!(collection.is_completed(), Ok(true));
    }

    #[test]
    fn consuming_iter_records_disposal() {
        let collection = Arc::new(BlockingCollection::<i32>::new());

        let disposer = {
            let collection = Arc::clone(&collection);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                collection.dispose();
            })
        };

        let mut iter = collection.consuming_iter().expect("iter");
        assert_eq!(iter.next(), None);
        assert!(iter.error().expect("disposal recorded").is_disposed());
        disposer.join().expect("join");
    }

    #[test]
    fn consuming_iter_debug_shows_progress() {
        let collection = BlockingCollection::<i32>::new();
        collection.add(7).expect("add");
        collection.complete_adding().expect("complete");

        let mut iter = collection.consuming_iter().expect("iter");
        let before = format!("{iter:?}");
        assert!(before.contains("ConsumingIter"));
        assert!(before.contains("count: 1"));
        assert!(before.contains("finished: false"));

        assert_eq!(iter.next(), Some(7));
        assert_eq!(iter.next(), None);
        assert!(format!("{iter:?}").contains("finished: true"));
    }
}

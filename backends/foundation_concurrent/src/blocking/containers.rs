// Backing containers a BlockingCollection can wrap. Each owns its storage and
// is safe to touch from many threads on its own, the blocking wrapper layers
// capacity, completion and wake-ups on top.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use crate::timeout::lock;

/// `ProducerConsumer` is the capability a backing container offers to a
/// [`super::BlockingCollection`].
///
/// Ordering is entirely up to the implementer, the wrapper never assumes
/// FIFO or LIFO behaviour.
pub trait ProducerConsumer<T>: Send + Sync {
    /// Attempts to store `item`, handing it back when the container refuses it.
    ///
    /// # Errors
    ///
    /// Returns the item when the container declines to store it.
    fn try_add(&self, item: T) -> Result<(), T>;

    /// Removes an item, `None` when the container is empty.
    fn try_take(&self) -> Option<T>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the items out in the container's own enumeration order.
    fn to_vec(&self) -> Vec<T>
    where
        T: Clone;
}

/// First-in first-out container, the default backing for a blocking collection.
pub struct ConcurrentQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> Default for ConcurrentQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ConcurrentQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T> FromIterator<T> for ConcurrentQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: Mutex::new(iter.into_iter().collect()),
        }
    }
}

impl<T: Send> ProducerConsumer<T> for ConcurrentQueue<T> {
    fn try_add(&self, item: T) -> Result<(), T> {
        lock(&self.items).push_back(item);
        Ok(())
    }

    fn try_take(&self) -> Option<T> {
        lock(&self.items).pop_front()
    }

    fn len(&self) -> usize {
        lock(&self.items).len()
    }

    fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        lock(&self.items).iter().cloned().collect()
    }
}

impl<T> fmt::Debug for ConcurrentQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentQueue")
            .field("len", &lock(&self.items).len())
            .finish()
    }
}

/// Last-in first-out container. Enumeration starts from the most recently
/// added item.
pub struct ConcurrentStack<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Default for ConcurrentStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ConcurrentStack<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }
}

impl<T> FromIterator<T> for ConcurrentStack<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: Mutex::new(iter.into_iter().collect()),
        }
    }
}

impl<T: Send> ProducerConsumer<T> for ConcurrentStack<T> {
    fn try_add(&self, item: T) -> Result<(), T> {
        lock(&self.items).push(item);
        Ok(())
    }

    fn try_take(&self) -> Option<T> {
        lock(&self.items).pop()
    }

    fn len(&self) -> usize {
        lock(&self.items).len()
    }

    fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        lock(&self.items).iter().rev().cloned().collect()
    }
}

impl<T> fmt::Debug for ConcurrentStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentStack")
            .field("len", &lock(&self.items).len())
            .finish()
    }
}

/// Unordered container, callers must not rely on the order items come out in.
pub struct ConcurrentBag<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Default for ConcurrentBag<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ConcurrentBag<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }
}

impl<T> FromIterator<T> for ConcurrentBag<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: Mutex::new(iter.into_iter().collect()),
        }
    }
}

impl<T: Send> ProducerConsumer<T> for ConcurrentBag<T> {
    fn try_add(&self, item: T) -> Result<(), T> {
        lock(&self.items).push(item);
        Ok(())
    }

    fn try_take(&self) -> Option<T> {
        let mut items = lock(&self.items);
        if items.is_empty() {
            return None;
        }
        // middle slot keeps takes from settling into stack order
        let slot = items.len() / 2;
        Some(items.swap_remove(slot))
    }

    fn len(&self) -> usize {
        lock(&self.items).len()
    }

    fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        lock(&self.items).clone()
    }
}

impl<T> fmt::Debug for ConcurrentBag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentBag")
            .field("len", &lock(&self.items).len())
            .finish()
    }
}

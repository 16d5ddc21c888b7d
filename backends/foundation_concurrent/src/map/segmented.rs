// Lock-striped hash map. Keys hash to one of `concurrency_level` segments,
// each a small chained table behind its own RwLock, so writers to different
// segments never contend. Whole-map operations lock every segment in
// ascending index order.

use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::comparer::{DefaultComparer, KeyComparer};
use crate::config::MapConfig;
use crate::errors::{ConcurrentError, ConcurrentResult};

struct Node<K, V> {
    key: K,
    value: V,
    hash: u64,

    /// Stamp of the last write to this entry, unique within its segment.
    version: u64,
}

struct Segment<K, V> {
    buckets: Vec<Vec<Node<K, V>>>,
    len: usize,
    stamp: u64,
}

impl<K, V> Segment<K, V> {
    fn with_buckets(count: usize) -> Self {
        Self {
            buckets: (0..count.max(1)).map(|_| Vec::new()).collect(),
            len: 0,
            stamp: 0,
        }
    }

    fn bucket_of(&self, hash: u64) -> usize {
        // low bits pick the segment, so buckets use the high half
        let spread = hash.rotate_right(32);
        (spread % self.buckets.len() as u64) as usize
    }

    fn next_stamp(&mut self) -> u64 {
        self.stamp += 1;
        self.stamp
    }

    fn find<C: KeyComparer<K>>(&self, comparer: &C, key: &K, hash: u64) -> Option<&Node<K, V>> {
        self.buckets[self.bucket_of(hash)]
            .iter()
            .find(|node| node.hash == hash && comparer.keys_equal(&node.key, key))
    }

    fn find_mut<C: KeyComparer<K>>(
        &mut self,
        comparer: &C,
        key: &K,
        hash: u64,
    ) -> Option<&mut Node<K, V>> {
        let bucket = self.bucket_of(hash);
        self.buckets[bucket]
            .iter_mut()
            .find(|node| node.hash == hash && comparer.keys_equal(&node.key, key))
    }

    /// Inserts a key the caller has checked is absent. Returns true when the
    /// segment grew.
    fn push(&mut self, key: K, value: V, hash: u64) -> bool {
        let version = self.next_stamp();
        let bucket = self.bucket_of(hash);
        self.buckets[bucket].push(Node {
            key,
            value,
            hash,
            version,
        });
        self.len += 1;

        if self.len > self.buckets.len() {
            self.grow();
            return true;
        }
        false
    }

    fn remove<C: KeyComparer<K>>(&mut self, comparer: &C, key: &K, hash: u64) -> Option<V> {
        let bucket = self.bucket_of(hash);
        let chain = &mut self.buckets[bucket];
        let position = chain
            .iter()
            .position(|node| node.hash == hash && comparer.keys_equal(&node.key, key))?;
        self.len -= 1;
        Some(chain.swap_remove(position).value)
    }

    fn grow(&mut self) {
        let doubled = self.buckets.len() * 2;
        let old = std::mem::replace(
            &mut self.buckets,
            (0..doubled).map(|_| Vec::new()).collect(),
        );
        for node in old.into_iter().flatten() {
            let bucket = self.bucket_of(node.hash);
            self.buckets[bucket].push(node);
        }
    }

    fn nodes(&self) -> impl Iterator<Item = &Node<K, V>> {
        self.buckets.iter().flatten()
    }

    fn clear(&mut self) {
        for chain in &mut self.buckets {
            chain.clear();
        }
        self.len = 0;
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(g) => g,
        Err(e) => e.into_inner(),
    }
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(g) => g,
        Err(e) => e.into_inner(),
    }
}

/// Default number of entries a map is sized for.
pub const DEFAULT_CAPACITY: usize = 31;

/// Default segment count, the number of threads expected to write at once.
#[must_use]
pub fn default_concurrency_level() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// `ConcurrentMap` is a thread-safe hash map striped over independently
/// locked segments.
///
/// Reads hand out clones of values, so no lock outlives a call. Factories
/// passed to [`ConcurrentMap::get_or_add_with`] and the `add_or_update`
/// family run outside every lock and may run more than once under
/// contention, but exactly one result is installed per call.
///
/// ```
/// use foundation_concurrent::map::ConcurrentMap;
///
/// let map = ConcurrentMap::new();
/// assert!(map.try_add("a", 1));
/// assert!(!map.try_add("a", 2));
/// assert_eq!(map.add_or_update("a", 0, |_, v| v + 10), 11);
/// assert_eq!(map.try_remove(&"a"), Some(11));
/// ```
pub struct ConcurrentMap<K, V, C = DefaultComparer> {
    segments: Vec<RwLock<Segment<K, V>>>,
    comparer: C,
}

// --- constructors

impl<K, V> Default for ConcurrentMap<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Hash + Eq,
{
    /// Creates a map with the default segment count and capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::build(
            default_concurrency_level(),
            DEFAULT_CAPACITY,
            DefaultComparer::<RandomState>::default(),
        )
    }

    /// Creates a map striped over `concurrency_level` segments, sized for
    /// `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `concurrency_level` is zero.
    pub fn with_options(concurrency_level: usize, capacity: usize) -> ConcurrentResult<Self> {
        Self::with_options_and_comparer(concurrency_level, capacity, DefaultComparer::default())
    }

    /// Creates a map from configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the configured concurrency level is zero.
    pub fn from_config(config: &MapConfig) -> ConcurrentResult<Self> {
        Self::with_options(config.concurrency_level, config.initial_capacity)
    }
}

impl<K, V, C> ConcurrentMap<K, V, C>
where
    C: KeyComparer<K>,
{
    #[must_use]
    pub fn with_comparer(comparer: C) -> Self {
        Self::build(default_concurrency_level(), DEFAULT_CAPACITY, comparer)
    }

    /// # Errors
    ///
    /// Returns `InvalidArgument` when `concurrency_level` is zero.
    pub fn with_options_and_comparer(
        concurrency_level: usize,
        capacity: usize,
        comparer: C,
    ) -> ConcurrentResult<Self> {
        if concurrency_level == 0 {
            return Err(ConcurrentError::InvalidArgument(
                "concurrency level must be greater than zero",
            ));
        }
        Ok(Self::build(concurrency_level, capacity, comparer))
    }

    fn build(concurrency_level: usize, capacity: usize, comparer: C) -> Self {
        let per_segment = capacity.div_ceil(concurrency_level);
        Self {
            segments: (0..concurrency_level)
                .map(|_| RwLock::new(Segment::with_buckets(per_segment)))
                .collect(),
            comparer,
        }
    }

    fn locate(&self, key: &K) -> (usize, u64) {
        let hash = self.comparer.hash_key(key);
        ((hash % self.segments.len() as u64) as usize, hash)
    }

    fn insert_absent(&self, segment: &mut Segment<K, V>, index: usize, key: K, value: V, hash: u64) {
        if segment.push(key, value, hash) {
            tracing::debug!(
                segment = index,
                buckets = segment.buckets.len(),
                entries = segment.len,
                "concurrent map segment grew"
            );
        }
    }
}

// --- single key operations

impl<K, V, C> ConcurrentMap<K, V, C>
where
    C: KeyComparer<K>,
{
    /// Returns a clone of the value stored for `key`.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let (index, hash) = self.locate(key);
        let segment = read(&self.segments[index]);
        segment
            .find(&self.comparer, key, hash)
            .map(|node| node.value.clone())
    }

    /// Same as [`Self::get`].
    pub fn try_get_value(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let (index, hash) = self.locate(key);
        read(&self.segments[index])
            .find(&self.comparer, key, hash)
            .is_some()
    }

    /// Stores `value` for `key`, replacing and returning any previous value.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let (index, hash) = self.locate(&key);
        let mut segment = write(&self.segments[index]);

        let stamp = segment.stamp + 1;
        if let Some(node) = segment.find_mut(&self.comparer, &key, hash) {
            node.version = stamp;
            let previous = std::mem::replace(&mut node.value, value);
            segment.stamp = stamp;
            return Some(previous);
        }

        self.insert_absent(&mut segment, index, key, value, hash);
        None
    }

    /// Adds `key` only when it is absent. Returns whether the entry was added.
    pub fn try_add(&self, key: K, value: V) -> bool {
        let (index, hash) = self.locate(&key);
        let mut segment = write(&self.segments[index]);
        if segment.find(&self.comparer, &key, hash).is_some() {
            return false;
        }
        self.insert_absent(&mut segment, index, key, value, hash);
        true
    }

    /// Removes `key`, returning its value. Of several racing removers of the
    /// same entry exactly one gets the value.
    pub fn try_remove(&self, key: &K) -> Option<V> {
        let (index, hash) = self.locate(key);
        write(&self.segments[index]).remove(&self.comparer, key, hash)
    }

    /// Replaces the value of `key` with `new_value` only if it currently
    /// equals `expected`.
    pub fn try_update(&self, key: &K, new_value: V, expected: &V) -> bool
    where
        V: PartialEq,
    {
        let (index, hash) = self.locate(key);
        let mut segment = write(&self.segments[index]);

        let stamp = segment.stamp + 1;
        match segment.find_mut(&self.comparer, key, hash) {
            Some(node) if node.value == *expected => {
                node.value = new_value;
                node.version = stamp;
                segment.stamp = stamp;
                true
            }
            _ => false,
        }
    }

    /// Returns the value of `key`, adding `value` first when absent.
    pub fn get_or_add(&self, key: K, value: V) -> V
    where
        V: Clone,
    {
        let (index, hash) = self.locate(&key);
        let mut segment = write(&self.segments[index]);
        if let Some(node) = segment.find(&self.comparer, &key, hash) {
            return node.value.clone();
        }
        self.insert_absent(&mut segment, index, key, value.clone(), hash);
        value
    }

    /// Returns the value of `key`, adding `factory(&key)` first when absent.
    ///
    /// The factory runs outside the segment lock. When another thread
    /// installs a value in the meantime that value wins and is returned.
    pub fn get_or_add_with<F>(&self, key: K, factory: F) -> V
    where
        V: Clone,
        F: FnOnce(&K) -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }

        let value = factory(&key);
        self.get_or_add(key, value)
    }

    /// Adds `add_value` when `key` is absent, otherwise replaces the current
    /// value with `update(&key, &current)`. Returns the value now stored.
    pub fn add_or_update<U>(&self, key: K, add_value: V, update: U) -> V
    where
        V: Clone,
        U: Fn(&K, &V) -> V,
    {
        self.upsert(key, |_| add_value.clone(), update)
    }

    /// Like [`Self::add_or_update`] with the added value produced by
    /// `add_factory`. Either factory may run more than once under contention.
    pub fn add_or_update_with<A, U>(&self, key: K, add_factory: A, update: U) -> V
    where
        V: Clone,
        A: Fn(&K) -> V,
        U: Fn(&K, &V) -> V,
    {
        self.upsert(key, add_factory, update)
    }

    fn upsert<A, U>(&self, key: K, add: A, update: U) -> V
    where
        V: Clone,
        A: Fn(&K) -> V,
        U: Fn(&K, &V) -> V,
    {
        let (index, hash) = self.locate(&key);
        let mut pending_add: Option<V> = None;

        loop {
            let current = read(&self.segments[index])
                .find(&self.comparer, &key, hash)
                .map(|node| (node.value.clone(), node.version));

            match current {
                Some((value, version)) => {
                    let updated = update(&key, &value);

                    let mut segment = write(&self.segments[index]);
                    let stamp = segment.stamp + 1;
                    if let Some(node) = segment.find_mut(&self.comparer, &key, hash) {
                        if node.version == version {
                            node.value = updated.clone();
                            node.version = stamp;
                            segment.stamp = stamp;
                            return updated;
                        }
                    }
                    tracing::trace!(segment = index, "concurrent map update raced, retrying");
                }
                None => {
                    let value = pending_add.take().unwrap_or_else(|| add(&key));

                    let mut segment = write(&self.segments[index]);
                    if segment.find(&self.comparer, &key, hash).is_none() {
                        self.insert_absent(&mut segment, index, key, value.clone(), hash);
                        return value;
                    }
                    // lost the race to another adder, keep the value for a later pass
                    pending_add = Some(value);
                }
            }
        }
    }
}

// --- whole map operations

impl<K, V, C> ConcurrentMap<K, V, C>
where
    C: KeyComparer<K>,
{
    fn read_all(&self) -> Vec<RwLockReadGuard<'_, Segment<K, V>>> {
        self.segments.iter().map(read).collect()
    }

    /// Number of entries, counted across all segments at one instant.
    pub fn len(&self) -> usize {
        self.read_all().iter().map(|segment| segment.len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A consistent snapshot of every entry.
    pub fn to_vec(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let segments = self.read_all();
        let mut entries = Vec::with_capacity(segments.iter().map(|s| s.len).sum());
        for segment in &segments {
            entries.extend(
                segment
                    .nodes()
                    .map(|node| (node.key.clone(), node.value.clone())),
            );
        }
        entries
    }

    /// Iterates a snapshot taken when this is called. Later writes are not
    /// reflected.
    pub fn iter(&self) -> Iter<K, V>
    where
        K: Clone,
        V: Clone,
    {
        Iter {
            entries: self.to_vec().into_iter(),
        }
    }

    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        let segments = self.read_all();
        segments
            .iter()
            .flat_map(|segment| segment.nodes().map(|node| node.key.clone()))
            .collect()
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        let segments = self.read_all();
        segments
            .iter()
            .flat_map(|segment| segment.nodes().map(|node| node.value.clone()))
            .collect()
    }

    /// Removes every entry. Segments keep their grown bucket arrays.
    pub fn clear(&self) {
        let mut segments: Vec<_> = self.segments.iter().map(write).collect();
        for segment in &mut segments {
            segment.clear();
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ConcurrentMap<K, V>
where
    K: Hash + Eq,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K, V, C> fmt::Debug for ConcurrentMap<K, V, C>
where
    C: KeyComparer<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentMap")
            .field("segments", &self.segments.len())
            .field("len", &self.len())
            .finish()
    }
}

/// Snapshot iterator returned by [`ConcurrentMap::iter`].
#[derive(Debug, Clone)]
pub struct Iter<K, V> {
    entries: std::vec::IntoIter<(K, V)>,
}

impl<K, V> Iterator for Iter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<K, V> {}

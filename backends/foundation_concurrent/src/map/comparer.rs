use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash, Hasher};

/// `KeyComparer` decides how a [`super::ConcurrentMap`] hashes and compares
/// its keys.
///
/// Implementations must keep the usual contract: keys that compare equal
/// hash to the same value.
pub trait KeyComparer<K>: Send + Sync {
    fn hash_key(&self, key: &K) -> u64;

    fn keys_equal(&self, left: &K, right: &K) -> bool;
}

/// Compares keys through their own `Hash` and `Eq` implementations.
#[derive(Debug, Clone, Default)]
pub struct DefaultComparer<S = RandomState> {
    build_hasher: S,
}

impl<S> DefaultComparer<S> {
    #[must_use]
    pub fn with_hasher(build_hasher: S) -> Self {
        Self { build_hasher }
    }
}

impl<K, S> KeyComparer<K> for DefaultComparer<S>
where
    K: Hash + Eq,
    S: BuildHasher + Send + Sync,
{
    fn hash_key(&self, key: &K) -> u64 {
        self.build_hasher.hash_one(key)
    }

    fn keys_equal(&self, left: &K, right: &K) -> bool {
        left == right
    }
}

/// Compares string-like keys ignoring case, folding with Unicode lowercase.
#[derive(Debug, Clone, Default)]
pub struct CaseInsensitive {
    build_hasher: RandomState,
}

impl CaseInsensitive {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K> KeyComparer<K> for CaseInsensitive
where
    K: AsRef<str>,
{
    fn hash_key(&self, key: &K) -> u64 {
        let mut hasher = self.build_hasher.build_hasher();
        for c in key.as_ref().chars().flat_map(char::to_lowercase) {
            hasher.write_u32(u32::from(c));
        }
        hasher.finish()
    }

    fn keys_equal(&self, left: &K, right: &K) -> bool {
        let (left, right) = (left.as_ref(), right.as_ref());
        if left.is_ascii() && right.is_ascii() {
            return left.eq_ignore_ascii_case(right);
        }
        left.chars()
            .flat_map(char::to_lowercase)
            .eq(right.chars().flat_map(char::to_lowercase))
    }
}

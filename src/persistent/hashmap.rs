//! Persistent (immutable) hash map based on chained buckets.
//!
//! This module provides [`PersistentHashMap`], an immutable hash map whose
//! bucket array is itself a [`PersistentVector`], and [`TransientHashMap`],
//! its single-owner builder.
//!
//! # Overview
//!
//! Each bucket is either empty or holds a short chain of `(key, value)` pairs
//! whose keys hash to that bucket. An update rebuilds one chain and writes it
//! back with a single path copy through the bucket vector, so consecutive
//! versions share everything but one trie path.
//!
//! - O(1) expected get
//! - O(log32 B) insert and remove, where B is the bucket count
//! - O(1) len and `is_empty`
//!
//! The bucket count is always a power of two, at least 8. It doubles when
//! more than two thirds of the buckets would be occupied and never shrinks.
//!
//! # Examples
//!
//! ```rust
//! use persistent_collections::persistent::PersistentHashMap;
//!
//! let map = PersistentHashMap::new()
//!     .assoc("one".to_string(), 1)
//!     .assoc("two".to_string(), 2)
//!     .assoc("three".to_string(), 3);
//!
//! assert_eq!(map.get("one"), Some(&1));
//! assert_eq!(map.get("three"), Some(&3));
//!
//! // The original map is preserved
//! let updated = map.assoc("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));
//! assert_eq!(updated.get("one"), Some(&100));
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::{self, FromIterator};
use std::marker::PhantomData;
use std::rc::Rc;

use log::{debug, trace};
use smallvec::SmallVec;

use super::ReferenceCounter;
use super::nested::Nested;
use super::vector::{PersistentVector, PersistentVectorIntoIterator, PersistentVectorIterator, TransientVector};
use crate::collection::AssociativeCollection;
use crate::error::CollectionError;

// =============================================================================
// Constants
// =============================================================================

/// Smallest bucket count a map is ever created with
const MINIMUM_BUCKET_COUNT: usize = 8;

/// A collision chain: every pair whose key hashes to one bucket.
type Chain<K, V> = ReferenceCounter<[(K, V)]>;

/// A bucket slot; `None` marks an empty bucket.
type Bucket<K, V> = Option<Chain<K, V>>;

/// Mutable buckets used while building or rehashing a whole map.
type Staging<K, V> = Vec<SmallVec<[(K, V); 2]>>;

// =============================================================================
// Hash computation
// =============================================================================

#[cfg(feature = "fxhash")]
type KeyHasher = rustc_hash::FxHasher;

#[cfg(all(feature = "ahash", not(feature = "fxhash")))]
type KeyHasher = ahash::AHasher;

#[cfg(not(any(feature = "fxhash", feature = "ahash")))]
type KeyHasher = std::collections::hash_map::DefaultHasher;

/// Computes the hash of a key with the hasher selected by crate features.
fn compute_hash<Q: Hash + ?Sized>(key: &Q) -> u64 {
    let mut hasher = KeyHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Selects the bucket for a hash.
#[inline]
#[allow(clippy::cast_possible_truncation)]
const fn bucket_index(hash: u64, bucket_count: usize) -> usize {
    // The remainder is below `bucket_count`, so it fits in usize.
    (hash % bucket_count as u64) as usize
}

/// Rounds a requested bucket count up to a power of two no smaller than
/// [`MINIMUM_BUCKET_COUNT`].
fn normalized_bucket_count(requested: usize) -> usize {
    requested
        .max(MINIMUM_BUCKET_COUNT)
        .checked_next_power_of_two()
        .unwrap_or(1 << (usize::BITS - 1))
}

/// Returns `true` if `occupied` buckets out of `bucket_count` is over the
/// two-thirds load limit.
#[inline]
const fn exceeds_load(occupied: usize, bucket_count: usize) -> bool {
    occupied.saturating_mul(3) > bucket_count.saturating_mul(2)
}

fn empty_staging<K, V>(bucket_count: usize) -> Staging<K, V> {
    (0..bucket_count).map(|_| SmallVec::new()).collect()
}

/// Places a pair into its staging bucket, replacing the value of an equal
/// key. Returns `true` if the key was not present.
fn stage<K: Hash + Eq, V>(staging: &mut Staging<K, V>, key: K, value: V) -> bool {
    let index = bucket_index(compute_hash(&key), staging.len());
    let chain = &mut staging[index];
    if let Some(entry) = chain.iter_mut().find(|(existing, _)| *existing == key) {
        entry.1 = value;
        false
    } else {
        chain.insert(0, (key, value));
        true
    }
}

fn restage<K: Hash + Eq, V>(staging: Staging<K, V>, bucket_count: usize) -> Staging<K, V> {
    let mut grown = empty_staging(bucket_count);
    for (key, value) in staging.into_iter().flatten() {
        stage(&mut grown, key, value);
    }
    grown
}

fn occupied_count<K, V>(staging: &Staging<K, V>) -> usize {
    staging.iter().filter(|chain| !chain.is_empty()).count()
}

// =============================================================================
// PersistentHashMap Definition
// =============================================================================

/// A persistent (immutable) hash map with chained buckets.
///
/// # Time Complexity
///
/// | Operation       | Complexity              |
/// |-----------------|-------------------------|
/// | `new`           | O(1)                    |
/// | `get`           | O(1) expected           |
/// | `assoc`         | O(log32 B) expected     |
/// | `dissoc`        | O(log32 B) expected     |
/// | `merge`         | O(M) for M merged pairs |
/// | `len`           | O(1)                    |
/// | `iter`          | O(N + B)                |
///
/// # Examples
///
/// ```rust
/// use persistent_collections::persistent::PersistentHashMap;
///
/// let map: PersistentHashMap<i32, &str> = [(1, "one"), (2, "two")].into_iter().collect();
/// assert_eq!(map.len(), 2);
/// assert_eq!(map.get(&1), Some(&"one"));
/// ```
pub struct PersistentHashMap<K, V> {
    /// Number of live pairs
    length: usize,
    /// Number of non-empty buckets
    occupied: usize,
    /// Bucket array; its length is a power of two, at least 8
    buckets: PersistentVector<Bucket<K, V>>,
}

impl<K, V> Clone for PersistentHashMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            length: self.length,
            occupied: self.occupied,
            buckets: self.buckets.clone(),
        }
    }
}

impl<K, V> PersistentHashMap<K, V> {
    /// Creates a new empty map with 8 buckets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentHashMap;
    ///
    /// let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
    /// assert!(map.is_empty());
    /// assert_eq!(map.bucket_count(), 8);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            length: 0,
            occupied: 0,
            buckets: iter::repeat_n(None, MINIMUM_BUCKET_COUNT).collect(),
        }
    }

    /// Returns the number of entries in the map.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the number of buckets.
    #[inline]
    #[must_use]
    pub const fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the number of non-empty buckets.
    ///
    /// Never more than two thirds of [`PersistentHashMap::bucket_count`].
    #[inline]
    #[must_use]
    pub const fn occupied_bucket_count(&self) -> usize {
        self.occupied
    }

    /// Returns an iterator over the entries, bucket by bucket.
    ///
    /// The order is fixed for a given map value but unrelated to insertion
    /// order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().assoc(1, "one").assoc(2, "two");
    /// let mut keys: Vec<i32> = map.iter().map(|(key, _)| *key).collect();
    /// keys.sort();
    /// assert_eq!(keys, vec![1, 2]);
    /// ```
    #[must_use]
    pub fn iter(&self) -> PersistentHashMapIterator<'_, K, V> {
        PersistentHashMapIterator {
            buckets: self.buckets.iter(),
            chain: <&[(K, V)]>::default().iter(),
            remaining: self.length,
        }
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }
}

impl<K: Hash + Eq, V> PersistentHashMap<K, V> {
    /// Creates a map from `entries` with a starting bucket count.
    ///
    /// A non-zero `bucket_count_hint` is rounded up to a power of two of at
    /// least 8. A zero hint derives the count from the number of entries.
    /// When a key repeats, the last value wins. The map grows past the hint
    /// if the entries would overload it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::with_bucket_count([("a", 1), ("b", 2), ("a", 3)], 100);
    /// assert_eq!(map.len(), 2);
    /// assert_eq!(map.get("a"), Some(&3));
    /// assert_eq!(map.bucket_count(), 128);
    /// ```
    #[must_use]
    pub fn with_bucket_count<I>(entries: I, bucket_count_hint: usize) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let entries: Vec<(K, V)> = entries.into_iter().collect();
        let requested = if bucket_count_hint == 0 {
            entries.len().saturating_mul(2)
        } else {
            bucket_count_hint
        };
        Self::from_entries(entries, normalized_bucket_count(requested))
    }

    /// Creates a map holding a single entry.
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        Self::with_bucket_count(iter::once((key, value)), 0)
    }

    /// Builds a map with at least `bucket_count` buckets, doubling until the
    /// load limit holds.
    fn from_entries<I>(entries: I, bucket_count: usize) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut staging = empty_staging(bucket_count);
        let mut length = 0;
        for (key, value) in entries {
            if stage(&mut staging, key, value) {
                length += 1;
            }
        }

        let mut occupied = occupied_count(&staging);
        while exceeds_load(occupied, staging.len()) {
            let doubled = staging.len() * 2;
            debug!(
                "rehashing {length} entries from {} to {doubled} buckets",
                staging.len()
            );
            staging = restage(staging, doubled);
            occupied = occupied_count(&staging);
        }

        Self {
            length,
            occupied,
            buckets: staging
                .into_iter()
                .map(|chain| (!chain.is_empty()).then(|| chain.into_iter().collect::<Chain<K, V>>()))
                .collect(),
        }
    }

    /// Returns the bucket index for `key` and the chain stored there.
    fn bucket_for<Q>(&self, key: &Q) -> (usize, Option<&Chain<K, V>>)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = bucket_index(compute_hash(key), self.buckets.len());
        (index, self.buckets.get(index).and_then(Option::as_ref))
    }

    /// Returns a reference to the value bound to `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().assoc("key".to_string(), 42);
    /// assert_eq!(map.get("key"), Some(&42));
    /// assert_eq!(map.get("missing"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (_, chain) = self.bucket_for(key);
        chain?
            .iter()
            .find(|(existing, _)| existing.borrow() == key)
            .map(|(_, value)| value)
    }

    /// Returns the value bound to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::KeyNotFound`] if `key` is absent.
    pub fn lookup<Q>(&self, key: &Q) -> Result<&V, CollectionError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).ok_or(CollectionError::KeyNotFound)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }
}

impl<K: Clone + Hash + Eq, V: Clone> PersistentHashMap<K, V> {
    /// Returns a copy of this map rehashed into `bucket_count` buckets.
    fn reallocate(&self, bucket_count: usize) -> Self {
        debug!(
            "reallocating hash map of {} entries from {} to {bucket_count} buckets",
            self.length,
            self.buckets.len()
        );
        Self::from_entries(
            self.iter().map(|(key, value)| (key.clone(), value.clone())),
            bucket_count,
        )
    }

    /// Inserts a key known to be absent, growing first if its bucket is
    /// empty and filling it would pass the load limit.
    fn insert_absent(&self, key: K, value: V) -> Self {
        let (index, existing) = self.bucket_for(&key);

        if existing.is_none() && exceeds_load(self.occupied + 1, self.buckets.len()) {
            return self
                .reallocate(self.buckets.len() * 2)
                .insert_absent(key, value);
        }

        let chain: Chain<K, V> = iter::once((key, value))
            .chain(existing.into_iter().flat_map(|pairs| pairs.iter().cloned()))
            .collect();

        Self {
            length: self.length + 1,
            occupied: self.occupied + usize::from(existing.is_none()),
            buckets: self.buckets.with_element(index, Some(chain)),
        }
    }

    /// Returns a new map without `key`.
    ///
    /// Returns a clone of `self` if `key` is absent. The bucket count never
    /// shrinks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().assoc("a", 1).assoc("b", 2);
    /// let removed = map.dissoc("a");
    ///
    /// assert_eq!(removed.len(), 1);
    /// assert!(!removed.contains_key("a"));
    /// assert_eq!(map.len(), 2);
    /// ```
    #[must_use]
    pub fn dissoc<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (index, existing) = self.bucket_for(key);
        let Some(chain) = existing else {
            return self.clone();
        };
        if !chain.iter().any(|(candidate, _)| candidate.borrow() == key) {
            return self.clone();
        }

        let remaining: Vec<(K, V)> = chain
            .iter()
            .filter(|(candidate, _)| candidate.borrow() != key)
            .cloned()
            .collect();
        let (bucket, occupied) = if remaining.is_empty() {
            (None, self.occupied - 1)
        } else {
            (Some(ReferenceCounter::from(remaining)), self.occupied)
        };

        Self {
            length: self.length - 1,
            occupied,
            buckets: self.buckets.with_element(index, bucket),
        }
    }

    /// Returns a new map holding the entries of `self` and `other`.
    ///
    /// Entries of `other` win on key collisions.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentHashMap;
    ///
    /// let left = PersistentHashMap::new().assoc(1, "a").assoc(2, "b");
    /// let right = PersistentHashMap::new().assoc(2, "B").assoc(3, "C");
    ///
    /// let merged = left.merge(&right);
    /// assert_eq!(merged.len(), 3);
    /// assert_eq!(merged.get(&2), Some(&"B"));
    /// ```
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        self.merge_all(iter::once(other))
    }

    /// Returns a new map holding the entries of `self` and every map in
    /// `others`, later maps winning on key collisions.
    #[must_use]
    pub fn merge_all<'a, I>(&self, others: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
        K: 'a,
        V: 'a,
    {
        let mut transient = self.clone().transient();
        for other in others {
            for (key, value) in other {
                transient.insert(key.clone(), value.clone());
            }
        }
        transient.persistent()
    }

    /// Converts this map into a [`TransientHashMap`] for batched updates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentHashMap;
    ///
    /// let original = PersistentHashMap::new().assoc("a", 1);
    /// let mut transient = original.clone().transient();
    /// transient.insert("b", 2);
    /// transient.remove("a");
    ///
    /// let updated = transient.persistent();
    /// assert_eq!(updated.len(), 1);
    /// assert_eq!(original.get("a"), Some(&1));
    /// ```
    #[must_use]
    pub fn transient(self) -> TransientHashMap<K, V> {
        TransientHashMap {
            length: self.length,
            occupied: self.occupied,
            buckets: self.buckets.transient(),
            _marker: PhantomData,
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone + PartialEq> PersistentHashMap<K, V> {
    /// Returns a new map with `key` bound to `value`.
    ///
    /// If `key` is already bound to an equal value, the result is a clone of
    /// `self` and no new structure is allocated.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().assoc("a", 1).assoc("b", 3);
    /// let with_c = map.assoc("c", 3);
    ///
    /// assert_eq!(with_c.len(), 3);
    /// assert_eq!(map.len(), 2);
    /// ```
    #[must_use]
    pub fn assoc(&self, key: K, value: V) -> Self {
        let (index, existing) = self.bucket_for(&key);

        if let Some(chain) = existing
            && let Some(position) = chain.iter().position(|(candidate, _)| *candidate == key)
        {
            if chain[position].1 == value {
                return self.clone();
            }
            let mut entries = chain.to_vec();
            entries[position].1 = value;
            return Self {
                length: self.length,
                occupied: self.occupied,
                buckets: self
                    .buckets
                    .with_element(index, Some(ReferenceCounter::from(entries))),
            };
        }

        self.insert_absent(key, value)
    }

    /// Sets the value found by following `path` from this map.
    ///
    /// Missing intermediate levels are created with [`Nested::empty_nested`].
    /// An empty path returns `self`.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Nested::assoc_in`] from nested levels.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::{Key, PersistentHashMap, Value};
    ///
    /// let map: PersistentHashMap<Key, Value<i32>> = PersistentHashMap::new();
    /// let map = map.assoc_in(&["a".into(), "b".into()], Value::Scalar(1)).unwrap();
    ///
    /// let nested = map.get(&Key::from("a")).and_then(Value::as_map).unwrap();
    /// assert_eq!(nested.get(&Key::from("b")), Some(&Value::Scalar(1)));
    /// ```
    pub fn assoc_in(&self, path: &[K], value: V) -> Result<Self, CollectionError>
    where
        V: Nested<K>,
    {
        match path {
            [] => Ok(self.clone()),
            [key] => Ok(self.assoc(key.clone(), value)),
            [key, rest @ ..] => {
                let nested = match self.get(key) {
                    Some(existing) => existing.assoc_in(rest, value)?,
                    None => V::empty_nested().assoc_in(rest, value)?,
                };
                Ok(self.assoc(key.clone(), nested))
            }
        }
    }
}

// =============================================================================
// TransientHashMap Definition
// =============================================================================

/// A single-owner builder for [`PersistentHashMap`].
///
/// Updates rewrite bucket chains in place through a [`TransientVector`] and
/// follow the same growth rule as the persistent map. It is neither `Send`
/// nor `Sync` and is frozen with [`TransientHashMap::persistent`].
///
/// # Examples
///
/// ```rust
/// use persistent_collections::persistent::TransientHashMap;
///
/// let mut transient = TransientHashMap::new();
/// assert_eq!(transient.insert("a", 1), None);
/// assert_eq!(transient.insert("a", 2), Some(1));
///
/// let map = transient.persistent();
/// assert_eq!(map.get("a"), Some(&2));
/// ```
pub struct TransientHashMap<K, V> {
    length: usize,
    occupied: usize,
    buckets: TransientVector<Bucket<K, V>>,
    _marker: PhantomData<Rc<()>>,
}

static_assertions::assert_not_impl_any!(TransientHashMap<i32, i32>: Send, Sync);

impl<K: Clone + Hash + Eq, V: Clone> TransientHashMap<K, V> {
    /// Creates an empty transient map with 8 buckets.
    #[must_use]
    pub fn new() -> Self {
        PersistentHashMap::new().transient()
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if there are no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn chain_at(&self, index: usize) -> Option<&Chain<K, V>> {
        self.buckets.get(index).and_then(Option::as_ref)
    }

    fn index_for<Q: Hash + ?Sized>(&self, key: &Q) -> usize {
        bucket_index(compute_hash(key), self.buckets.len())
    }

    /// Returns a reference to the value bound to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.chain_at(self.index_for(key))?
            .iter()
            .find(|(existing, _)| existing.borrow() == key)
            .map(|(_, value)| value)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Binds `key` to `value`, returning the previous value if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let index = self.index_for(&key);
        let existing = self.chain_at(index).cloned();

        if let Some(chain) = &existing
            && let Some(position) = chain.iter().position(|(candidate, _)| *candidate == key)
        {
            let mut entries = chain.to_vec();
            let previous = std::mem::replace(&mut entries[position].1, value);
            self.buckets
                .replace(index, Some(ReferenceCounter::from(entries)));
            return Some(previous);
        }

        if existing.is_none() && exceeds_load(self.occupied + 1, self.buckets.len()) {
            self.grow();
            return self.insert(key, value);
        }

        let chain: Chain<K, V> = iter::once((key, value))
            .chain(existing.iter().flat_map(|pairs| pairs.iter().cloned()))
            .collect();
        self.occupied += usize::from(existing.is_none());
        self.length += 1;
        self.buckets.replace(index, Some(chain));
        None
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.index_for(key);
        let chain = self.chain_at(index)?;
        let position = chain
            .iter()
            .position(|(candidate, _)| candidate.borrow() == key)?;

        let mut entries = chain.to_vec();
        let (_, value) = entries.remove(position);
        if entries.is_empty() {
            self.occupied -= 1;
            self.buckets.replace(index, None);
        } else {
            self.buckets
                .replace(index, Some(ReferenceCounter::from(entries)));
        }
        self.length -= 1;
        Some(value)
    }

    /// Doubles the bucket count and rehashes every entry.
    fn grow(&mut self) {
        let bucket_count = self.buckets.len() * 2;
        debug!(
            "reallocating transient hash map of {} entries from {} to {bucket_count} buckets",
            self.length,
            self.buckets.len()
        );

        let entries: Vec<(K, V)> = (0..self.buckets.len())
            .filter_map(|index| self.chain_at(index))
            .flat_map(|chain| chain.iter().cloned())
            .collect();
        let rebuilt = PersistentHashMap::from_entries(entries, bucket_count);

        self.occupied = rebuilt.occupied;
        self.buckets = rebuilt.buckets.transient();
    }

    /// Freezes this transient into a [`PersistentHashMap`].
    #[must_use]
    pub fn persistent(self) -> PersistentHashMap<K, V> {
        trace!("freezing transient hash map of {} entries", self.length);
        PersistentHashMap {
            length: self.length,
            occupied: self.occupied,
            buckets: self.buckets.persistent(),
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone> Default for TransientHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over entries of a [`PersistentHashMap`].
pub struct PersistentHashMapIterator<'a, K, V> {
    buckets: PersistentVectorIterator<'a, Bucket<K, V>>,
    chain: std::slice::Iter<'a, (K, V)>,
    remaining: usize,
}

impl<'a, K, V> Iterator for PersistentHashMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, value)) = self.chain.next() {
                self.remaining -= 1;
                return Some((key, value));
            }
            if let Some(chain) = self.buckets.next()? {
                self.chain = chain.iter();
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for PersistentHashMapIterator<'_, K, V> {}

/// An owning iterator over entries of a [`PersistentHashMap`].
pub struct PersistentHashMapIntoIterator<K, V> {
    buckets: PersistentVectorIntoIterator<Bucket<K, V>>,
    chain: Bucket<K, V>,
    position: usize,
    remaining: usize,
}

impl<K: Clone, V: Clone> Iterator for PersistentHashMapIntoIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chain) = &self.chain
                && let Some(entry) = chain.get(self.position)
            {
                self.position += 1;
                self.remaining -= 1;
                return Some(entry.clone());
            }
            self.chain = self.buckets.next()?;
            self.position = 0;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Clone, V: Clone> ExactSizeIterator for PersistentHashMapIntoIterator<K, V> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V> Default for PersistentHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for PersistentHashMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::with_bucket_count(iter, 0)
    }
}

impl<K: Clone, V: Clone> IntoIterator for PersistentHashMap<K, V> {
    type Item = (K, V);
    type IntoIter = PersistentHashMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentHashMapIntoIterator {
            remaining: self.length,
            buckets: self.buckets.into_iter(),
            chain: None,
            position: 0,
        }
    }
}

impl<'a, K, V> IntoIterator for &'a PersistentHashMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = PersistentHashMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Two maps are equal when they hold the same pairs, whatever their bucket
/// counts or insertion history.
impl<K: Hash + Eq, V: PartialEq> PartialEq for PersistentHashMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K: Hash + Eq, V: Eq> Eq for PersistentHashMap<K, V> {}

/// Hashes the length and the wrapping sum of per-entry hashes, which does not
/// depend on iteration order.
impl<K: Hash + Eq, V: Hash> Hash for PersistentHashMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let combined = self
            .iter()
            .fold(0_u64, |accumulator, entry| accumulator.wrapping_add(compute_hash(&entry)));
        self.length.hash(state);
        combined.hash(state);
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PersistentHashMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone + Hash + Eq, V: Clone + PartialEq> AssociativeCollection for PersistentHashMap<K, V> {
    type Key = K;
    type Value = V;

    fn len(&self) -> usize {
        self.length
    }

    fn contains_key(&self, key: &K) -> bool {
        Self::contains_key(self, key)
    }

    fn lookup(&self, key: &K) -> Result<&V, CollectionError> {
        Self::lookup(self, key)
    }

    fn assoc(&self, key: K, value: V) -> Self {
        Self::assoc(self, key, value)
    }

    fn dissoc(&self, key: &K) -> Self {
        Self::dissoc(self, key)
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K: serde::Serialize, V: serde::Serialize> serde::Serialize for PersistentHashMap<K, V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentHashMapVisitor<K, V> {
    marker: PhantomData<(K, V)>,
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for PersistentHashMapVisitor<K, V>
where
    K: serde::Deserialize<'de> + Hash + Eq,
    V: serde::Deserialize<'de>,
{
    type Value = PersistentHashMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        const MAX_PREALLOCATE: usize = 4096;
        let capacity = access.size_hint().unwrap_or(0).min(MAX_PREALLOCATE);
        let mut entries = Vec::with_capacity(capacity);
        while let Some(entry) = access.next_entry()? {
            entries.push(entry);
        }
        Ok(PersistentHashMap::with_bucket_count(entries, 0))
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for PersistentHashMap<K, V>
where
    K: serde::Deserialize<'de> + Hash + Eq,
    V: serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentHashMapVisitor {
            marker: PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Persistent (immutable) hash set.
//!
//! This module provides [`PersistentHashSet`], an immutable hash set backed by
//! a [`PersistentHashMap`] from element to `()`, and [`TransientHashSet`], its
//! single-owner builder.
//!
//! Membership, size and iteration come straight from the map's keys. The set
//! algebra (union, intersection, difference, symmetric difference and the
//! subset tests) comes from [`SetCollection`] and only uses `contains`, `add`,
//! `discard` and element iteration.
//!
//! # Examples
//!
//! ```rust
//! use persistent_collections::persistent::PersistentHashSet;
//!
//! let set: PersistentHashSet<i32> = [1, 2, 3, 1].into_iter().collect();
//! assert_eq!(set.len(), 3);
//!
//! let with_four = set.add(4);
//! assert_eq!(with_four.len(), 4);
//! assert_eq!(set.len(), 3);
//!
//! assert!(set.remove(&99).is_err());
//! ```
//!
//! # Set Operations
//!
//! ```rust
//! use persistent_collections::prelude::*;
//!
//! let set_a: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
//! let set_b: PersistentHashSet<i32> = [2, 3, 4].into_iter().collect();
//!
//! assert_eq!((&set_a | &set_b).len(), 4);
//! assert_eq!((&set_a & &set_b).len(), 2);
//! assert_eq!((&set_a - &set_b).len(), 1);
//! assert_eq!((&set_a ^ &set_b).len(), 2);
//! assert!(set_a.intersection(&set_b) <= set_a);
//! ```

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::ops::{BitAnd, BitOr, BitXor, Sub};
use std::rc::Rc;

use super::hashmap::{PersistentHashMapIntoIterator, PersistentHashMapIterator};
use super::{PersistentHashMap, TransientHashMap};
use crate::collection::SetCollection;
use crate::error::CollectionError;

// =============================================================================
// PersistentHashSet Definition
// =============================================================================

/// A persistent (immutable) hash set based on [`PersistentHashMap`].
///
/// # Time Complexity
///
/// | Operation  | Complexity          |
/// |------------|---------------------|
/// | `new`      | O(1)                |
/// | `contains` | O(1) expected       |
/// | `add`      | O(log32 B) expected |
/// | `discard`  | O(log32 B) expected |
/// | `union`    | O(M) for M added    |
/// | `len`      | O(1)                |
///
/// # Examples
///
/// ```rust
/// use persistent_collections::persistent::PersistentHashSet;
///
/// let set = PersistentHashSet::new().add("a").add("b");
/// assert!(set.contains("a"));
/// assert_eq!(format!("{}", PersistentHashSet::singleton(1)), "{1}");
/// ```
pub struct PersistentHashSet<T> {
    inner: PersistentHashMap<T, ()>,
}

impl<T> Clone for PersistentHashSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PersistentHashSet<T> {
    /// Creates a new empty set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: PersistentHashMap::new(),
        }
    }

    /// Returns the number of elements in the set.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over the elements.
    #[must_use]
    pub fn iter(&self) -> PersistentHashSetIterator<'_, T> {
        PersistentHashSetIterator {
            inner: self.inner.iter(),
        }
    }
}

impl<T: Hash + Eq> PersistentHashSet<T> {
    /// Creates a set from `elements` with a starting bucket count.
    ///
    /// The hint is interpreted as by [`PersistentHashMap::with_bucket_count`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentHashSet;
    ///
    /// let set = PersistentHashSet::with_bucket_count([1, 2, 2], 64);
    /// assert_eq!(set.len(), 2);
    /// ```
    #[must_use]
    pub fn with_bucket_count<I>(elements: I, bucket_count_hint: usize) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self {
            inner: PersistentHashMap::with_bucket_count(
                elements.into_iter().map(|element| (element, ())),
                bucket_count_hint,
            ),
        }
    }

    /// Creates a set containing a single element.
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self {
            inner: PersistentHashMap::singleton(element, ()),
        }
    }

    /// Returns `true` if the set contains `element`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentHashSet;
    ///
    /// let set = PersistentHashSet::singleton("hello".to_string());
    /// assert!(set.contains("hello"));
    /// assert!(!set.contains("world"));
    /// ```
    #[must_use]
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(element)
    }
}

impl<T: Clone + Hash + Eq> PersistentHashSet<T> {
    /// Returns a new set that also contains `element`.
    ///
    /// Adding a present element returns a clone of `self`.
    #[must_use]
    pub fn add(&self, element: T) -> Self {
        Self {
            inner: self.inner.assoc(element, ()),
        }
    }

    /// Returns a new set without `element`; absent elements are ignored.
    #[must_use]
    pub fn discard<Q>(&self, element: &Q) -> Self
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Self {
            inner: self.inner.dissoc(element),
        }
    }

    /// Returns a new set without `element`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::KeyNotFound`] if `element` is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::CollectionError;
    /// use persistent_collections::persistent::PersistentHashSet;
    ///
    /// let set: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
    /// assert_eq!(set.remove(&2).unwrap().len(), 2);
    /// assert_eq!(set.remove(&99), Err(CollectionError::KeyNotFound));
    /// ```
    pub fn remove<Q>(&self, element: &Q) -> Result<Self, CollectionError>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.contains(element) {
            Ok(self.discard(element))
        } else {
            Err(CollectionError::KeyNotFound)
        }
    }

    /// Converts this set into a [`TransientHashSet`] for batched updates.
    #[must_use]
    pub fn transient(self) -> TransientHashSet<T> {
        TransientHashSet {
            inner: self.inner.transient(),
            _marker: PhantomData,
        }
    }
}

impl<T: Clone + Hash + Eq> SetCollection for PersistentHashSet<T> {
    type Element = T;

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn contains(&self, element: &T) -> bool {
        Self::contains(self, element)
    }

    fn add(&self, element: T) -> Self {
        Self::add(self, element)
    }

    fn discard(&self, element: &T) -> Self {
        Self::discard(self, element)
    }

    fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

// =============================================================================
// TransientHashSet Definition
// =============================================================================

/// A single-owner builder for [`PersistentHashSet`].
///
/// Neither `Send` nor `Sync`; frozen with [`TransientHashSet::persistent`].
///
/// # Examples
///
/// ```rust
/// use persistent_collections::persistent::TransientHashSet;
///
/// let mut transient = TransientHashSet::new();
/// assert!(transient.insert(1));
/// assert!(!transient.insert(1));
/// transient.extend([2, 3]);
///
/// let set = transient.persistent();
/// assert_eq!(set.len(), 3);
/// ```
pub struct TransientHashSet<T> {
    inner: TransientHashMap<T, ()>,
    _marker: PhantomData<Rc<()>>,
}

static_assertions::assert_not_impl_any!(TransientHashSet<i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientHashSet<String>: Send, Sync);

impl<T: Clone + Hash + Eq> TransientHashSet<T> {
    /// Creates an empty transient set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: TransientHashMap::new(),
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if there are no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns `true` if the set contains `element`.
    #[must_use]
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(element)
    }

    /// Inserts `element`, returning `true` if it was not present.
    pub fn insert(&mut self, element: T) -> bool {
        self.inner.insert(element, ()).is_none()
    }

    /// Removes `element`, returning `true` if it was present.
    pub fn remove<Q>(&mut self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.remove(element).is_some()
    }

    /// Inserts every element of `iter`.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for element in iter {
            self.insert(element);
        }
    }

    /// Freezes this transient into a [`PersistentHashSet`].
    #[must_use]
    pub fn persistent(self) -> PersistentHashSet<T> {
        PersistentHashSet {
            inner: self.inner.persistent(),
        }
    }
}

impl<T: Clone + Hash + Eq> Default for TransientHashSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over elements of a [`PersistentHashSet`].
pub struct PersistentHashSetIterator<'a, T> {
    inner: PersistentHashMapIterator<'a, T, ()>,
}

impl<'a, T> Iterator for PersistentHashSetIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for PersistentHashSetIterator<'_, T> {}

/// An owning iterator over elements of a [`PersistentHashSet`].
pub struct PersistentHashSetIntoIterator<T> {
    inner: PersistentHashMapIntoIterator<T, ()>,
}

impl<T: Clone> Iterator for PersistentHashSetIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T: Clone> ExactSizeIterator for PersistentHashSetIntoIterator<T> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for PersistentHashSet<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq> FromIterator<T> for PersistentHashSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::with_bucket_count(iter, 0)
    }
}

impl<T: Clone> IntoIterator for PersistentHashSet<T> {
    type Item = T;
    type IntoIter = PersistentHashSetIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentHashSetIntoIterator {
            inner: self.inner.into_iter(),
        }
    }
}

impl<'a, T> IntoIterator for &'a PersistentHashSet<T> {
    type Item = &'a T;
    type IntoIter = PersistentHashSetIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Hash + Eq> PartialEq for PersistentHashSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T: Hash + Eq> Eq for PersistentHashSet<T> {}

/// Orders sets by inclusion: `a <= b` when `a` is a subset of `b`. Sets that
/// are not subsets of each other are incomparable.
impl<T: Clone + Hash + Eq> PartialOrd for PersistentHashSet<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.is_subset(other), other.is_subset(self)) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => None,
        }
    }
}

impl<T: Hash + Eq> Hash for PersistentHashSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentHashSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for PersistentHashSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        for (position, element) in self.iter().enumerate() {
            if position > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "}}")
    }
}

impl<T: Clone + Hash + Eq> BitOr for &PersistentHashSet<T> {
    type Output = PersistentHashSet<T>;

    fn bitor(self, other: Self) -> Self::Output {
        self.union(other)
    }
}

impl<T: Clone + Hash + Eq> BitAnd for &PersistentHashSet<T> {
    type Output = PersistentHashSet<T>;

    fn bitand(self, other: Self) -> Self::Output {
        self.intersection(other)
    }
}

impl<T: Clone + Hash + Eq> Sub for &PersistentHashSet<T> {
    type Output = PersistentHashSet<T>;

    fn sub(self, other: Self) -> Self::Output {
        self.difference(other)
    }
}

impl<T: Clone + Hash + Eq> BitXor for &PersistentHashSet<T> {
    type Output = PersistentHashSet<T>;

    fn bitxor(self, other: Self) -> Self::Output {
        self.symmetric_difference(other)
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for PersistentHashSet<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut sequence = serializer.serialize_seq(Some(self.len()))?;
        for element in self {
            sequence.serialize_element(element)?;
        }
        sequence.end()
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for PersistentHashSet<T>
where
    T: serde::Deserialize<'de> + Hash + Eq,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let elements = <Vec<T> as serde::Deserialize>::deserialize(deserializer)?;
        Ok(Self::with_bucket_count(elements, 0))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn set_of(elements: &[i32]) -> PersistentHashSet<i32> {
        elements.iter().copied().collect()
    }

    #[rstest]
    fn test_display_braces() {
        assert_eq!(format!("{}", PersistentHashSet::<i32>::new()), "{}");
        assert_eq!(format!("{}", set_of(&[7])), "{7}");
    }

    #[rstest]
    fn test_add_existing_keeps_length() {
        let set = set_of(&[1, 2]);
        assert_eq!(set.add(2).len(), 2);
        assert_eq!(set.add(2), set);
    }

    #[rstest]
    fn test_discard_absent_is_not_an_error() {
        let set = set_of(&[1, 2]);
        assert_eq!(set.discard(&5), set);
    }

    #[rstest]
    #[case(&[1], &[1, 2], Some(Ordering::Less))]
    #[case(&[1, 2], &[1], Some(Ordering::Greater))]
    #[case(&[1, 2], &[2, 1], Some(Ordering::Equal))]
    #[case(&[1, 3], &[1, 2], None)]
    #[case(&[], &[4], Some(Ordering::Less))]
    fn test_partial_cmp_is_inclusion(
        #[case] left: &[i32],
        #[case] right: &[i32],
        #[case] expected: Option<Ordering>,
    ) {
        assert_eq!(set_of(left).partial_cmp(&set_of(right)), expected);
    }

    #[rstest]
    fn test_transient_insert_remove() {
        let original = set_of(&[1, 2, 3]);
        let mut transient = original.clone().transient();
        assert!(transient.remove(&1));
        assert!(!transient.remove(&1));
        assert!(transient.insert(10));
        assert!(transient.contains(&10));

        let updated = transient.persistent();
        assert_eq!(updated, set_of(&[2, 3, 10]));
        assert_eq!(original, set_of(&[1, 2, 3]));
    }

    #[rstest]
    fn test_hash_matches_for_equal_sets_with_different_buckets() {
        use std::collections::hash_map::DefaultHasher;

        fn hash_of(set: &PersistentHashSet<i32>) -> u64 {
            let mut hasher = DefaultHasher::new();
            set.hash(&mut hasher);
            hasher.finish()
        }

        let small = PersistentHashSet::with_bucket_count(0..20, 0);
        let large = PersistentHashSet::with_bucket_count((0..20).rev(), 1024);
        assert_eq!(small, large);
        assert_eq!(hash_of(&small), hash_of(&large));
    }
}

//! Collection interfaces shared by the persistent types.
//!
//! This module provides three traits that describe what a persistent
//! collection can do without naming its representation:
//!
//! - [`IndexedCollection`]: ordered, integer-indexed sequences
//! - [`AssociativeCollection`]: key to value mappings
//! - [`SetCollection`]: finite sets, including the set algebra
//!
//! Every "updating" method returns a new collection and leaves the receiver
//! untouched.
//!
//! # Laws
//!
//! ## Index round trip
//!
//! ```text
//! c.assoc(i, v)?.lookup(i) == Ok(&v)                 // for 0 <= i < c.len()
//! c.assoc(i, v)?.lookup(j) == c.lookup(j)            // for j != i
//! ```
//!
//! ## Key round trip
//!
//! ```text
//! m.assoc(k, v).lookup(&k) == Ok(&v)
//! m.dissoc(&k).contains_key(&k) == false
//! ```
//!
//! ## Set algebra
//!
//! ```text
//! a.union(&b).contains(x)        == a.contains(x) || b.contains(x)
//! a.intersection(&b).contains(x) == a.contains(x) && b.contains(x)
//! a.difference(&b).contains(x)   == a.contains(x) && !b.contains(x)
//! ```
//!
//! # Examples
//!
//! ```rust
//! use persistent_collections::collection::SetCollection;
//! use persistent_collections::persistent::PersistentHashSet;
//!
//! let left: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
//! let right: PersistentHashSet<i32> = [3, 4].into_iter().collect();
//!
//! assert_eq!(left.union(&right).len(), 4);
//! assert_eq!(left.intersection(&right).len(), 1);
//! assert!(left.difference(&right).is_disjoint(&right));
//! ```

use crate::error::CollectionError;

/// An ordered collection addressed by integer position.
///
/// Negative indices count from the end: `-1` is the last element.
pub trait IndexedCollection: Sized {
    /// The element type.
    type Element;

    /// Returns the number of elements.
    fn len(&self) -> usize;

    /// Returns `true` if there are no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::IndexOutOfRange`] outside `[0, len)` after
    /// negative-index normalization.
    fn lookup(&self, index: isize) -> Result<&Self::Element, CollectionError>;

    /// Returns a new collection with the element at `index` replaced.
    ///
    /// An index equal to `len()` appends.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::IndexOutOfRange`] outside `[0, len]` after
    /// negative-index normalization.
    fn assoc(&self, index: isize, element: Self::Element) -> Result<Self, CollectionError>;

    /// Returns a new collection with `element` appended.
    #[must_use]
    fn push_back(&self, element: Self::Element) -> Self;

    /// Iterates over the elements in index order.
    fn elements(&self) -> impl Iterator<Item = &Self::Element>;

    /// Returns `true` if any element equals `element`.
    fn contains_element(&self, element: &Self::Element) -> bool
    where
        Self::Element: PartialEq,
    {
        self.elements().any(|candidate| candidate == element)
    }
}

/// A mapping from keys to values.
pub trait AssociativeCollection: Sized {
    /// The key type.
    type Key;
    /// The value type.
    type Value;

    /// Returns the number of entries.
    fn len(&self) -> usize;

    /// Returns `true` if there are no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `key` is present.
    fn contains_key(&self, key: &Self::Key) -> bool;

    /// Returns the value bound to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::KeyNotFound`] if `key` is absent.
    fn lookup(&self, key: &Self::Key) -> Result<&Self::Value, CollectionError>;

    /// Returns a new mapping with `key` bound to `value`.
    #[must_use]
    fn assoc(&self, key: Self::Key, value: Self::Value) -> Self;

    /// Returns a new mapping without `key`. Absent keys are not an error.
    #[must_use]
    fn dissoc(&self, key: &Self::Key) -> Self;

    /// Iterates over the entries.
    fn entries(&self) -> impl Iterator<Item = (&Self::Key, &Self::Value)>;
}

/// A finite set.
///
/// # Required Methods
///
/// - `len`, `contains`, `add`, `discard`, `elements`
///
/// # Provided Methods
///
/// The set algebra is written purely in terms of the required methods, so any
/// implementor gets a consistent `union`, `intersection`, `difference`,
/// `symmetric_difference`, `is_subset`, `is_superset` and `is_disjoint`.
pub trait SetCollection: Clone {
    /// The element type.
    type Element;

    /// Returns the number of elements.
    fn len(&self) -> usize;

    /// Returns `true` if there are no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `element` is a member.
    fn contains(&self, element: &Self::Element) -> bool;

    /// Returns a new set that also contains `element`.
    #[must_use]
    fn add(&self, element: Self::Element) -> Self;

    /// Returns a new set without `element`. Absent elements are not an error.
    #[must_use]
    fn discard(&self, element: &Self::Element) -> Self;

    /// Iterates over the members.
    fn elements(&self) -> impl Iterator<Item = &Self::Element>;

    /// Returns a new set without `element`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::KeyNotFound`] if `element` is absent.
    fn remove(&self, element: &Self::Element) -> Result<Self, CollectionError> {
        if self.contains(element) {
            Ok(self.discard(element))
        } else {
            Err(CollectionError::KeyNotFound)
        }
    }

    /// Returns the elements in `self` or `other`.
    #[must_use]
    fn union(&self, other: &Self) -> Self
    where
        Self::Element: Clone,
    {
        other
            .elements()
            .fold(self.clone(), |accumulator, element| accumulator.add(element.clone()))
    }

    /// Returns the elements in both `self` and `other`.
    #[must_use]
    fn intersection(&self, other: &Self) -> Self {
        self.elements()
            .filter(|element| !other.contains(element))
            .fold(self.clone(), |accumulator, element| accumulator.discard(element))
    }

    /// Returns the elements in `self` but not in `other`.
    #[must_use]
    fn difference(&self, other: &Self) -> Self {
        self.elements()
            .filter(|element| other.contains(element))
            .fold(self.clone(), |accumulator, element| accumulator.discard(element))
    }

    /// Returns the elements in exactly one of `self` and `other`.
    #[must_use]
    fn symmetric_difference(&self, other: &Self) -> Self
    where
        Self::Element: Clone,
    {
        self.difference(other).union(&other.difference(self))
    }

    /// Returns `true` if every element of `self` is in `other`.
    fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.elements().all(|element| other.contains(element))
    }

    /// Returns `true` if every element of `other` is in `self`.
    fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Returns `true` if `self` and `other` share no element.
    fn is_disjoint(&self, other: &Self) -> bool {
        let (smaller, larger) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        smaller.elements().all(|element| !larger.contains(element))
    }
}

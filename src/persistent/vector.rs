//! Persistent (immutable) vector based on a 32-way radix trie.
//!
//! This module provides [`PersistentVector`], an indexed sequence that uses
//! structural sharing, and [`TransientVector`], its single-owner builder.
//!
//! # Overview
//!
//! `PersistentVector` keeps all but its most recent elements in a trie of
//! fixed fan-out 32 and the most recent (up to 32) elements in a separate tail
//! buffer. It provides:
//!
//! - O(log32 N) random access (effectively O(1) for practical sizes)
//! - O(log32 N) `push_back` (amortized O(1) thanks to the tail)
//! - O(log32 N) `assoc`
//! - O(1) `len` and `is_empty`
//!
//! Every update returns a new vector. The old vector stays valid and the two
//! share every node that was not on the updated path.
//!
//! # Examples
//!
//! ```rust
//! use persistent_collections::persistent::PersistentVector;
//!
//! let vector = PersistentVector::new()
//!     .push_back(1)
//!     .push_back(2)
//!     .push_back(3);
//!
//! let updated = vector.assoc(1, 99).unwrap();
//! assert_eq!(updated, PersistentVector::from_slice(&[1, 99, 3]));
//!
//! // The original vector is preserved
//! assert_eq!(vector, PersistentVector::from_slice(&[1, 2, 3]));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::ops::{Add, Bound, Index, RangeBounds};
use std::rc::Rc;

use arrayvec::ArrayVec;
use log::trace;

use super::ReferenceCounter;
use super::nested::{Nested, PathKey};
use super::node::{BITS_PER_LEVEL, BRANCHING_FACTOR, MASK, Node};
use crate::collection::IndexedCollection;
use crate::error::CollectionError;

// =============================================================================
// PersistentVector Definition
// =============================================================================

/// A persistent (immutable) indexed sequence.
///
/// # Time Complexity
///
/// | Operation    | Complexity                      |
/// |--------------|---------------------------------|
/// | `new`        | O(1)                            |
/// | `get`        | O(log32 N)                      |
/// | `lookup`     | O(log32 N)                      |
/// | `push_back`  | O(log32 N) amortized O(1)       |
/// | `assoc`      | O(log32 N)                      |
/// | `extend`     | O(M) for M appended elements    |
/// | `slice`      | O(K) for K selected elements    |
/// | `len`        | O(1)                            |
/// | `iter`       | O(1) to create, O(N) to iterate |
///
/// # Examples
///
/// ```rust
/// use persistent_collections::persistent::PersistentVector;
///
/// let vector: PersistentVector<i32> = (0..100).collect();
/// assert_eq!(vector.len(), 100);
/// assert_eq!(vector.get(50), Some(&50));
/// assert_eq!(vector.lookup(-1), Ok(&99));
/// ```
pub struct PersistentVector<T> {
    /// Total number of elements
    length: usize,
    /// Bit offset of the root level: (depth - 1) * `BITS_PER_LEVEL`
    shift: usize,
    /// Root node of the trie
    root: ReferenceCounter<Node<T>>,
    /// Most recently appended elements (up to 32)
    tail: ReferenceCounter<[T]>,
}

impl<T> Clone for PersistentVector<T> {
    fn clone(&self) -> Self {
        Self {
            length: self.length,
            shift: self.shift,
            root: self.root.clone(),
            tail: self.tail.clone(),
        }
    }
}

impl<T> PersistentVector<T> {
    /// Creates a new empty vector.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = PersistentVector::new();
    /// assert!(vector.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            length: 0,
            shift: BITS_PER_LEVEL,
            root: ReferenceCounter::new(Node::empty_branch()),
            tail: ReferenceCounter::from(Vec::<T>::new()),
        }
    }

    /// Creates a vector containing a single element.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let vector = PersistentVector::singleton(42);
    /// assert_eq!(vector.len(), 1);
    /// assert_eq!(vector.get(0), Some(&42));
    /// ```
    #[inline]
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self {
            length: 1,
            shift: BITS_PER_LEVEL,
            root: ReferenceCounter::new(Node::empty_branch()),
            tail: ReferenceCounter::from(vec![element]),
        }
    }

    /// Returns the number of elements in the vector.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the vector contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the index of the first element held by the tail.
    #[inline]
    fn tail_offset(&self) -> usize {
        self.length - self.tail.len()
    }

    /// Returns the 32-aligned chunk of elements that contains `index`.
    ///
    /// Chunks before the tail offset are trie leaves; the last chunk is the
    /// tail itself.
    fn chunk_for(&self, index: usize) -> Option<&ReferenceCounter<[T]>> {
        if index >= self.length {
            None
        } else if index >= self.tail_offset() {
            Some(&self.tail)
        } else {
            self.root.leaf_for(self.shift, index)
        }
    }

    /// Returns a reference to the element at the given index.
    ///
    /// Returns `None` if the index is out of bounds.
    ///
    /// # Arguments
    ///
    /// * `index` - The zero-based index of the element
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=5).collect();
    /// assert_eq!(vector.get(0), Some(&1));
    /// assert_eq!(vector.get(4), Some(&5));
    /// assert_eq!(vector.get(10), None);
    /// ```
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.chunk_for(index)?.get(index & MASK)
    }

    /// Converts a possibly negative index into an absolute position.
    ///
    /// Negative indices count from the end. Returns `None` when a negative
    /// index reaches before the first element.
    fn resolve_index(&self, index: isize) -> Option<usize> {
        if index < 0 {
            self.length.checked_sub(index.unsigned_abs())
        } else {
            Some(index.unsigned_abs())
        }
    }

    /// Returns the element at `index`, counting from the end when negative.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::IndexOutOfRange`] if the normalized index is
    /// outside `[0, len)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::CollectionError;
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let vector = PersistentVector::from_slice(&[10, 20, 30]);
    /// assert_eq!(vector.lookup(-1), Ok(&30));
    /// assert_eq!(
    ///     vector.lookup(-4),
    ///     Err(CollectionError::IndexOutOfRange { index: -4, length: 3 })
    /// );
    /// ```
    pub fn lookup(&self, index: isize) -> Result<&T, CollectionError> {
        self.resolve_index(index)
            .and_then(|position| self.get(position))
            .ok_or(CollectionError::IndexOutOfRange {
                index,
                length: self.length,
            })
    }

    /// Returns a reference to the first element.
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns a reference to the last element.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.tail.last()
    }

    /// Returns an iterator over references to the elements, front to back.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (1..=3).collect();
    /// let doubled: Vec<i32> = vector.iter().map(|x| x * 2).collect();
    /// assert_eq!(doubled, vec![2, 4, 6]);
    /// ```
    #[must_use]
    pub fn iter(&self) -> PersistentVectorIterator<'_, T> {
        PersistentVectorIterator {
            vector: self,
            chunk: &[],
            front: 0,
            back: self.length,
        }
    }
}

impl<T: PartialEq> PersistentVector<T> {
    /// Returns the position of the first element equal to `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let vector = PersistentVector::from_slice(&['a', 'b', 'a']);
    /// assert_eq!(vector.index_of(&'a'), Some(0));
    /// assert_eq!(vector.index_of(&'z'), None);
    /// ```
    #[must_use]
    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.iter().position(|element| element == value)
    }

    /// Returns the position of the first element equal to `value` within
    /// `range`.
    ///
    /// The range is clamped to the vector; the returned position is absolute.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let vector = PersistentVector::from_slice(&['a', 'b', 'a']);
    /// assert_eq!(vector.index_of_within(&'a', 1..), Some(2));
    /// assert_eq!(vector.index_of_within(&'a', 1..2), None);
    /// ```
    #[must_use]
    pub fn index_of_within<R: RangeBounds<usize>>(&self, value: &T, range: R) -> Option<usize> {
        let (start, end) = self.clamp_range(&range);
        (start..end).find(|&position| self.get(position) == Some(value))
    }

    /// Returns the number of elements equal to `value`.
    #[must_use]
    pub fn count_of(&self, value: &T) -> usize {
        self.iter().filter(|element| *element == value).count()
    }

    /// Returns `true` if some element equals `value`.
    #[must_use]
    pub fn contains_element(&self, value: &T) -> bool {
        self.iter().any(|element| element == value)
    }
}

impl<T> PersistentVector<T> {
    /// Clamps a range to `[0, len]`, returning `(start, end)` with
    /// `start <= end`.
    fn clamp_range<R: RangeBounds<usize>>(&self, range: &R) -> (usize, usize) {
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(self.length);
        let end = match range.end_bound() {
            Bound::Included(&end) => end.saturating_add(1),
            Bound::Excluded(&end) => end,
            Bound::Unbounded => self.length,
        }
        .min(self.length);
        (start, end.max(start))
    }
}

impl<T: Clone> PersistentVector<T> {
    /// Creates a vector holding clones of the elements of `slice`.
    #[must_use]
    pub fn from_slice(slice: &[T]) -> Self {
        slice.iter().cloned().collect()
    }

    /// Appends an element to the back of the vector.
    ///
    /// Returns a new vector with the element at the end.
    ///
    /// # Complexity
    ///
    /// O(log32 N) amortized O(1) due to the tail buffer
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let vector = PersistentVector::new()
    ///     .push_back(1)
    ///     .push_back(2)
    ///     .push_back(3);
    ///
    /// assert_eq!(vector.len(), 3);
    /// assert_eq!(vector.get(2), Some(&3));
    /// ```
    #[must_use]
    pub fn push_back(&self, element: T) -> Self {
        if self.tail.len() < BRANCHING_FACTOR {
            let mut new_tail = Vec::with_capacity(self.tail.len() + 1);
            new_tail.extend_from_slice(&self.tail);
            new_tail.push(element);

            Self {
                length: self.length + 1,
                shift: self.shift,
                root: self.root.clone(),
                tail: ReferenceCounter::from(new_tail),
            }
        } else {
            self.absorb_tail(element)
        }
    }

    /// Moves the full tail into the trie and starts a new tail with `element`.
    fn absorb_tail(&self, element: T) -> Self {
        let tail_offset = self.tail_offset();
        let tail_leaf = Node::Leaf(self.tail.clone());

        let (root, shift) = if (tail_offset >> self.shift) >= BRANCHING_FACTOR {
            trace!(
                "persistent vector root overflow at length {}, shift {} -> {}",
                self.length,
                self.shift,
                self.shift + BITS_PER_LEVEL
            );
            let grown = Node::grow_root(self.root.clone(), self.shift, tail_leaf);
            (grown, self.shift + BITS_PER_LEVEL)
        } else {
            (self.root.push_tail(self.shift, tail_offset, tail_leaf), self.shift)
        };

        Self {
            length: self.length + 1,
            shift,
            root: ReferenceCounter::new(root),
            tail: ReferenceCounter::from(vec![element]),
        }
    }

    /// Returns a copy with the element at `index` replaced.
    ///
    /// `index` must be below `len()`; callers check the bound.
    pub(crate) fn with_element(&self, index: usize, element: T) -> Self {
        let tail_offset = self.tail_offset();

        if index >= tail_offset {
            let mut new_tail = self.tail.to_vec();
            if let Some(slot) = new_tail.get_mut(index - tail_offset) {
                *slot = element;
            }
            Self {
                length: self.length,
                shift: self.shift,
                root: self.root.clone(),
                tail: ReferenceCounter::from(new_tail),
            }
        } else {
            Self {
                length: self.length,
                shift: self.shift,
                root: ReferenceCounter::new(self.root.assoc(self.shift, index, element)),
                tail: self.tail.clone(),
            }
        }
    }

    /// Updates the element at a non-negative `index`.
    ///
    /// Returns `None` if the index is out of bounds. Unlike
    /// [`PersistentVector::assoc`], this never appends.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let vector = PersistentVector::from_slice(&[1, 2, 3]);
    /// let updated = vector.update(1, 20).unwrap();
    /// assert_eq!(updated.get(1), Some(&20));
    /// assert!(vector.update(3, 40).is_none());
    /// ```
    #[must_use]
    pub fn update(&self, index: usize, element: T) -> Option<Self> {
        (index < self.length).then(|| self.with_element(index, element))
    }

    /// Returns a new vector with the element at `index` set to `element`.
    ///
    /// Negative indices count from the end. An index equal to `len()`
    /// appends.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::IndexOutOfRange`] if the normalized index is
    /// outside `[0, len]`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let vector = PersistentVector::from_slice(&[1, 2, 3]);
    /// assert_eq!(vector.assoc(1, 99).unwrap(), PersistentVector::from_slice(&[1, 99, 3]));
    /// assert_eq!(vector.assoc(-1, 0).unwrap(), PersistentVector::from_slice(&[1, 2, 0]));
    /// assert_eq!(vector.assoc(3, 4).unwrap().len(), 4);
    /// assert!(vector.assoc(4, 5).is_err());
    /// ```
    pub fn assoc(&self, index: isize, element: T) -> Result<Self, CollectionError> {
        match self.resolve_index(index) {
            Some(position) if position == self.length => Ok(self.push_back(element)),
            Some(position) if position < self.length => Ok(self.with_element(position, element)),
            _ => Err(CollectionError::IndexOutOfRange {
                index,
                length: self.length,
            }),
        }
    }

    /// Appends every element of `iter`, in order.
    ///
    /// Equivalent to calling [`PersistentVector::push_back`] repeatedly, but
    /// the intermediate versions are built in place by a [`TransientVector`]
    /// that nobody else can observe.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let vector = PersistentVector::from_slice(&[1, 2, 3]);
    /// let extended = vector.extend(4..=6);
    ///
    /// assert_eq!(extended.len(), 6);
    /// assert_eq!(vector.len(), 3);
    /// ```
    #[must_use]
    pub fn extend<I>(&self, iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut iter = iter.into_iter();
        let Some(first) = iter.next() else {
            return self.clone();
        };

        let mut transient = self.push_back(first).transient();
        transient.extend(iter);
        transient.persistent()
    }

    /// Returns a new vector holding the elements in `range`.
    ///
    /// The range is clamped to the vector. Selecting the whole vector returns
    /// a value that shares all of its structure with `self`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..10).collect();
    /// assert_eq!(vector.slice(2..5), PersistentVector::from_slice(&[2, 3, 4]));
    /// assert_eq!(vector.slice(8..), PersistentVector::from_slice(&[8, 9]));
    ///
    /// let (start, end) = (7, 3);
    /// assert!(vector.slice(start..end).is_empty());
    /// ```
    #[must_use]
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Self {
        let (start, end) = self.clamp_range(&range);
        if start == 0 && end == self.length {
            return self.clone();
        }
        self.iter().skip(start).take(end - start).cloned().collect()
    }

    /// Returns every `step`-th element of `range`, starting at its first
    /// position.
    ///
    /// The range is clamped as by [`PersistentVector::slice`]. A step of 1 is
    /// `slice`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::InvalidArgument`] if `step` is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let vector: PersistentVector<i32> = (0..10).collect();
    /// assert_eq!(
    ///     vector.slice_step(.., 3).unwrap(),
    ///     PersistentVector::from_slice(&[0, 3, 6, 9])
    /// );
    /// assert!(vector.slice_step(.., 0).is_err());
    /// ```
    pub fn slice_step<R: RangeBounds<usize>>(
        &self,
        range: R,
        step: usize,
    ) -> Result<Self, CollectionError> {
        match step {
            0 => Err(CollectionError::invalid_argument("slice step cannot be zero")),
            1 => Ok(self.slice(range)),
            _ => {
                let (start, end) = self.clamp_range(&range);
                Ok(self
                    .iter()
                    .skip(start)
                    .take(end - start)
                    .step_by(step)
                    .cloned()
                    .collect())
            }
        }
    }

    /// Returns the concatenation of `times` copies of this vector.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let vector = PersistentVector::from_slice(&[1, 2]);
    /// assert_eq!(vector.repeat(3), PersistentVector::from_slice(&[1, 2, 1, 2, 1, 2]));
    /// assert!(vector.repeat(0).is_empty());
    /// ```
    #[must_use]
    pub fn repeat(&self, times: usize) -> Self {
        match times {
            0 => Self::new(),
            1 => self.clone(),
            _ => self.extend((1..times).flat_map(|_| self.iter().cloned())),
        }
    }

    /// Sets the value found by following `path` from this vector.
    ///
    /// The first key must be an integral index: `len()` appends a new nested
    /// value built from [`Nested::empty_nested`], any other valid index
    /// descends into the existing element. An empty path returns `self`.
    ///
    /// # Errors
    ///
    /// - [`CollectionError::InvalidArgument`] if a key used as a sequence
    ///   index is not integral, or the path descends into a scalar.
    /// - [`CollectionError::IndexOutOfRange`] if an index is out of range.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::{Key, PersistentVector, Value};
    ///
    /// let inner: PersistentVector<Value<i32>> =
    ///     PersistentVector::from_slice(&[Value::Scalar(1), Value::Scalar(2)]);
    /// let outer = PersistentVector::singleton(Value::Vector(inner));
    ///
    /// let updated = outer
    ///     .assoc_in(&[Key::Index(0), Key::Index(1)], Value::Scalar(20))
    ///     .unwrap();
    /// let Value::Vector(row) = updated.get(0).unwrap() else { unreachable!() };
    /// assert_eq!(row.get(1), Some(&Value::Scalar(20)));
    /// ```
    pub fn assoc_in<K>(&self, path: &[K], value: T) -> Result<Self, CollectionError>
    where
        K: PathKey,
        T: Nested<K>,
    {
        let Some((first, rest)) = path.split_first() else {
            return Ok(self.clone());
        };
        let index = first.as_index().ok_or_else(|| {
            CollectionError::invalid_argument(format!("{first:?} cannot be interpreted as an index"))
        })?;

        if rest.is_empty() {
            return self.assoc(index, value);
        }
        if usize::try_from(index).is_ok_and(|position| position == self.length) {
            return Ok(self.push_back(T::empty_nested().assoc_in(rest, value)?));
        }

        let nested = self.lookup(index)?.assoc_in(rest, value)?;
        self.assoc(index, nested)
    }

    /// Converts this vector into a [`TransientVector`] for batched updates.
    ///
    /// Nodes still shared with other vectors are copied on first write, so
    /// converting never affects any other value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_collections::persistent::PersistentVector;
    ///
    /// let original = PersistentVector::from_slice(&[1, 2, 3]);
    /// let mut transient = original.clone().transient();
    /// transient.push_back(4);
    /// transient.set(0, 10).unwrap();
    ///
    /// let updated = transient.persistent();
    /// assert_eq!(updated, PersistentVector::from_slice(&[10, 2, 3, 4]));
    /// assert_eq!(original, PersistentVector::from_slice(&[1, 2, 3]));
    /// ```
    #[must_use]
    pub fn transient(self) -> TransientVector<T> {
        TransientVector {
            length: self.length,
            shift: self.shift,
            root: self.root,
            tail: self.tail.iter().cloned().collect(),
            _marker: PhantomData,
        }
    }
}

// =============================================================================
// TransientVector Definition
// =============================================================================

/// A single-owner builder for [`PersistentVector`].
///
/// A transient writes directly into trie nodes whenever it holds the only
/// reference to them, and copies shared nodes before writing. It is neither
/// `Send` nor `Sync` and is frozen exactly once with
/// [`TransientVector::persistent`].
///
/// # Examples
///
/// ```rust
/// use persistent_collections::persistent::TransientVector;
///
/// let mut transient = TransientVector::new();
/// for index in 0..100 {
///     transient.push_back(index);
/// }
/// let vector = transient.persistent();
/// assert_eq!(vector.len(), 100);
/// assert_eq!(vector.get(99), Some(&99));
/// ```
pub struct TransientVector<T> {
    length: usize,
    shift: usize,
    root: ReferenceCounter<Node<T>>,
    tail: ArrayVec<T, BRANCHING_FACTOR>,
    _marker: PhantomData<Rc<()>>,
}

static_assertions::assert_not_impl_any!(TransientVector<i32>: Send, Sync);

impl<T: Clone> TransientVector<T> {
    /// Creates an empty transient vector.
    #[must_use]
    pub fn new() -> Self {
        PersistentVector::new().transient()
    }

    /// Returns the number of elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if there are no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    fn tail_offset(&self) -> usize {
        self.length - self.tail.len()
    }

    /// Returns a reference to the element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.length {
            return None;
        }
        let tail_offset = self.tail_offset();
        if index >= tail_offset {
            self.tail.get(index - tail_offset)
        } else {
            self.root.leaf_for(self.shift, index)?.get(index & MASK)
        }
    }

    /// Appends an element in place.
    pub fn push_back(&mut self, element: T) {
        if self.tail.is_full() {
            self.absorb_tail();
        }
        self.tail.push(element);
        self.length += 1;
    }

    /// Appends every element of `iter` in place.
    pub fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        for element in iter {
            self.push_back(element);
        }
    }

    /// Moves the full tail into the trie, leaving the tail empty.
    fn absorb_tail(&mut self) {
        let tail_offset = self.tail_offset();
        let tail_leaf = Node::Leaf(std::mem::take(&mut self.tail).into_iter().collect());

        if (tail_offset >> self.shift) >= BRANCHING_FACTOR {
            trace!(
                "transient vector root overflow at length {}, shift {} -> {}",
                self.length,
                self.shift,
                self.shift + BITS_PER_LEVEL
            );
            let old_root =
                std::mem::replace(&mut self.root, ReferenceCounter::new(Node::empty_branch()));
            self.root = ReferenceCounter::new(Node::grow_root(old_root, self.shift, tail_leaf));
            self.shift += BITS_PER_LEVEL;
        } else {
            Node::push_tail_mut(&mut self.root, self.shift, tail_offset, tail_leaf);
        }
    }

    /// Overwrites the element at `index` without copying nodes this
    /// transient owns exclusively.
    ///
    /// Indices past the end are ignored.
    pub(crate) fn replace(&mut self, index: usize, element: T) {
        if index >= self.length {
            return;
        }
        let tail_offset = self.tail_offset();
        if index >= tail_offset {
            if let Some(slot) = self.tail.get_mut(index - tail_offset) {
                *slot = element;
            }
        } else {
            Node::assoc_mut(&mut self.root, self.shift, index, element);
        }
    }

    /// Overwrites the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::IndexOutOfRange`] if `index >= len()`.
    pub fn set(&mut self, index: usize, element: T) -> Result<(), CollectionError> {
        if index >= self.length {
            return Err(CollectionError::IndexOutOfRange {
                index: isize::try_from(index).unwrap_or(isize::MAX),
                length: self.length,
            });
        }
        self.replace(index, element);
        Ok(())
    }

    /// Freezes this transient into a [`PersistentVector`].
    #[must_use]
    pub fn persistent(self) -> PersistentVector<T> {
        trace!("freezing transient vector of length {}", self.length);
        PersistentVector {
            length: self.length,
            shift: self.shift,
            root: self.root,
            tail: self.tail.into_iter().collect(),
        }
    }
}

impl<T: Clone> Default for TransientVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for TransientVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_list()
            .entries((0..self.length).filter_map(|index| self.get(index)))
            .finish()
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over references to elements of a [`PersistentVector`].
///
/// Walks the vector one 32-element chunk at a time, so each leaf is located
/// once rather than once per element.
pub struct PersistentVectorIterator<'a, T> {
    vector: &'a PersistentVector<T>,
    /// Chunk holding `front`, or empty before the first lookup
    chunk: &'a [T],
    front: usize,
    back: usize,
}

impl<'a, T> Iterator for PersistentVectorIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        if self.front & MASK == 0 || self.chunk.is_empty() {
            self.chunk = self.vector.chunk_for(self.front).map(|chunk| &**chunk)?;
        }
        let element = self.chunk.get(self.front & MASK)?;
        self.front += 1;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for PersistentVectorIterator<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.vector.get(self.back)
    }
}

impl<T> ExactSizeIterator for PersistentVectorIterator<'_, T> {}

/// An owning iterator over elements of a [`PersistentVector`].
///
/// Elements are cloned out of the shared chunks.
pub struct PersistentVectorIntoIterator<T> {
    vector: PersistentVector<T>,
    chunk: Option<ReferenceCounter<[T]>>,
    position: usize,
}

impl<T: Clone> Iterator for PersistentVectorIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.vector.length {
            return None;
        }
        if self.position & MASK == 0 || self.chunk.is_none() {
            self.chunk = self.vector.chunk_for(self.position).cloned();
        }
        let element = self.chunk.as_ref()?.get(self.position & MASK)?.clone();
        self.position += 1;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.vector.length - self.position;
        (remaining, Some(remaining))
    }
}

impl<T: Clone> ExactSizeIterator for PersistentVectorIntoIterator<T> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for PersistentVector<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> FromIterator<T> for PersistentVector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut transient = TransientVector::new();
        transient.extend(iter);
        transient.persistent()
    }
}

impl<T: Clone> IntoIterator for PersistentVector<T> {
    type Item = T;
    type IntoIter = PersistentVectorIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentVectorIntoIterator {
            vector: self,
            chunk: None,
            position: 0,
        }
    }
}

impl<'a, T> IntoIterator for &'a PersistentVector<T> {
    type Item = &'a T;
    type IntoIter = PersistentVectorIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> Index<usize> for PersistentVector<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    fn index(&self, index: usize) -> &Self::Output {
        match self.get(index) {
            Some(element) => element,
            None => panic!(
                "index out of bounds: the len is {} but the index is {index}",
                self.length
            ),
        }
    }
}

impl<T: Clone> Add for PersistentVector<T> {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        self.extend(other)
    }
}

impl<T: Clone> Add<&PersistentVector<T>> for &PersistentVector<T> {
    type Output = PersistentVector<T>;

    fn add(self, other: &PersistentVector<T>) -> Self::Output {
        self.extend(other.iter().cloned())
    }
}

impl<T: PartialEq> PartialEq for PersistentVector<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.length != other.length {
            return false;
        }
        if ReferenceCounter::ptr_eq(&self.root, &other.root)
            && ReferenceCounter::ptr_eq(&self.tail, &other.tail)
        {
            return true;
        }
        self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for PersistentVector<T> {}

impl<T: PartialOrd> PartialOrd for PersistentVector<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord> Ord for PersistentVector<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

/// Hashes the length followed by each element in order, so equal vectors
/// hash equally and order matters.
impl<T: Hash> Hash for PersistentVector<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for element in self {
            element.hash(state);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for PersistentVector<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[")?;
        for (position, element) in self.iter().enumerate() {
            if position > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "]")
    }
}

impl<T: Clone> IndexedCollection for PersistentVector<T> {
    type Element = T;

    fn len(&self) -> usize {
        self.length
    }

    fn lookup(&self, index: isize) -> Result<&T, CollectionError> {
        Self::lookup(self, index)
    }

    fn assoc(&self, index: isize, element: T) -> Result<Self, CollectionError> {
        Self::assoc(self, index, element)
    }

    fn push_back(&self, element: T) -> Self {
        Self::push_back(self, element)
    }

    fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for PersistentVector<T> {
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
struct PersistentVectorVisitor<T> {
    marker: PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for PersistentVectorVisitor<T>
where
    T: serde::Deserialize<'de> + Clone,
{
    type Value = PersistentVector<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut sequence: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut transient = TransientVector::new();
        while let Some(element) = sequence.next_element()? {
            transient.push_back(element);
        }
        Ok(transient.persistent())
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for PersistentVector<T>
where
    T: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentVectorVisitor {
            marker: PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn shares_root<T>(left: &PersistentVector<T>, right: &PersistentVector<T>) -> bool {
        ReferenceCounter::ptr_eq(&left.root, &right.root)
    }

    // =========================================================================
    // Display Tests
    // =========================================================================

    #[rstest]
    #[case(PersistentVector::new(), "[]")]
    #[case(PersistentVector::singleton(42), "[42]")]
    #[case((1..=3).collect(), "[1, 2, 3]")]
    fn test_display(#[case] vector: PersistentVector<i32>, #[case] expected: &str) {
        assert_eq!(format!("{vector}"), expected);
    }

    #[rstest]
    fn test_debug_is_a_list() {
        let vector = PersistentVector::from_slice(&["a", "b"]);
        assert_eq!(format!("{vector:?}"), r#"["a", "b"]"#);
    }

    // =========================================================================
    // Structure Tests
    // =========================================================================

    #[rstest]
    fn test_new_has_shift_five_and_empty_tail() {
        let vector: PersistentVector<i32> = PersistentVector::new();
        assert_eq!(vector.shift, BITS_PER_LEVEL);
        assert!(vector.tail.is_empty());
        assert_eq!(vector.tail_offset(), 0);
    }

    #[rstest]
    #[case(1, 0, 1)]
    #[case(32, 0, 32)]
    #[case(33, 32, 1)]
    #[case(64, 32, 32)]
    #[case(65, 64, 1)]
    #[case(1056, 1024, 32)]
    fn test_tail_holds_last_chunk(
        #[case] length: usize,
        #[case] expected_offset: usize,
        #[case] expected_tail: usize,
    ) {
        let vector: PersistentVector<usize> =
            (0..length).fold(PersistentVector::new(), |accumulator, x| accumulator.push_back(x));
        assert_eq!(vector.tail_offset(), expected_offset);
        assert_eq!(vector.tail.len(), expected_tail);
    }

    #[rstest]
    #[case(1056, BITS_PER_LEVEL)]
    #[case(1057, 2 * BITS_PER_LEVEL)]
    fn test_root_grows_when_capacity_is_exhausted(
        #[case] length: usize,
        #[case] expected_shift: usize,
    ) {
        let persistent: PersistentVector<usize> =
            (0..length).fold(PersistentVector::new(), |accumulator, x| accumulator.push_back(x));
        let transient: PersistentVector<usize> = (0..length).collect();

        assert_eq!(persistent.shift, expected_shift);
        assert_eq!(transient.shift, expected_shift);
        assert_eq!(persistent, transient);
    }

    #[rstest]
    fn test_push_back_shares_root_while_tail_has_room() {
        let vector: PersistentVector<i32> = (0..40).collect();
        let pushed = vector.push_back(40);
        assert!(shares_root(&vector, &pushed));
    }

    #[rstest]
    fn test_tail_update_shares_root() {
        let vector: PersistentVector<i32> = (0..40).collect();
        let updated = vector.with_element(35, -1);
        assert!(shares_root(&vector, &updated));
        assert!(!ReferenceCounter::ptr_eq(&vector.tail, &updated.tail));
    }

    #[rstest]
    fn test_root_update_shares_tail() {
        let vector: PersistentVector<i32> = (0..40).collect();
        let updated = vector.with_element(3, -1);
        assert!(!shares_root(&vector, &updated));
        assert!(ReferenceCounter::ptr_eq(&vector.tail, &updated.tail));
    }

    // =========================================================================
    // Index Tests
    // =========================================================================

    #[rstest]
    #[case(0, Ok(&10))]
    #[case(2, Ok(&30))]
    #[case(-1, Ok(&30))]
    #[case(-3, Ok(&10))]
    #[case(3, Err(CollectionError::IndexOutOfRange { index: 3, length: 3 }))]
    #[case(-4, Err(CollectionError::IndexOutOfRange { index: -4, length: 3 }))]
    fn test_lookup(#[case] index: isize, #[case] expected: Result<&i32, CollectionError>) {
        let vector = PersistentVector::from_slice(&[10, 20, 30]);
        assert_eq!(vector.lookup(index), expected);
    }

    #[rstest]
    fn test_assoc_past_end_fails() {
        let vector = PersistentVector::from_slice(&[1, 2, 3]);
        assert_eq!(
            vector.assoc(4, 0),
            Err(CollectionError::IndexOutOfRange { index: 4, length: 3 })
        );
        assert_eq!(
            vector.assoc(-4, 0),
            Err(CollectionError::IndexOutOfRange { index: -4, length: 3 })
        );
    }

    #[rstest]
    fn test_assoc_at_length_appends() {
        let vector = PersistentVector::from_slice(&[1, 2, 3]);
        let appended = vector.assoc(3, 4).unwrap();
        assert_eq!(appended, PersistentVector::from_slice(&[1, 2, 3, 4]));
    }

    #[rstest]
    fn test_update_never_appends() {
        let vector = PersistentVector::from_slice(&[1, 2, 3]);
        assert!(vector.update(3, 4).is_none());
        assert_eq!(vector.update(0, 9).unwrap().first(), Some(&9));
    }

    #[rstest]
    fn test_first_and_last() {
        let vector: PersistentVector<i32> = (1..=100).collect();
        assert_eq!(vector.first(), Some(&1));
        assert_eq!(vector.last(), Some(&100));
        assert_eq!(PersistentVector::<i32>::new().last(), None);
    }

    #[rstest]
    #[should_panic(expected = "index out of bounds")]
    fn test_index_operator_panics_out_of_bounds() {
        let vector = PersistentVector::from_slice(&[1]);
        let _ = vector[1];
    }

    // =========================================================================
    // Query Tests
    // =========================================================================

    #[rstest]
    fn test_index_of_and_count_of() {
        let vector = PersistentVector::from_slice(&[1, 2, 1, 3, 1]);
        assert_eq!(vector.index_of(&3), Some(3));
        assert_eq!(vector.index_of(&4), None);
        assert_eq!(vector.count_of(&1), 3);
        assert_eq!(vector.index_of_within(&1, 1..), Some(2));
        assert_eq!(vector.index_of_within(&1, 3..=3), None);
        assert_eq!(vector.index_of_within(&1, 10..), None);
    }

    #[rstest]
    fn test_slice_full_range_shares_structure() {
        let vector: PersistentVector<i32> = (0..100).collect();
        let sliced = vector.slice(..);
        assert!(shares_root(&vector, &sliced));
        assert!(ReferenceCounter::ptr_eq(&vector.tail, &sliced.tail));
    }

    #[rstest]
    fn test_slice_is_clamped() {
        let vector: PersistentVector<i32> = (0..10).collect();
        assert_eq!(vector.slice(5..100), (5..10).collect::<PersistentVector<_>>());
        assert!(vector.slice(20..).is_empty());
    }

    #[rstest]
    #[case((Bound::Unbounded, Bound::Unbounded), 2, vec![0, 2, 4, 6, 8])]
    #[case((Bound::Included(1), Bound::Unbounded), 4, vec![1, 5, 9])]
    #[case((Bound::Included(3), Bound::Included(7)), 2, vec![3, 5, 7])]
    #[case((Bound::Included(8), Bound::Excluded(100)), 5, vec![8])]
    #[case((Bound::Unbounded, Bound::Unbounded), 1, (0..10).collect())]
    fn test_slice_step(
        #[case] range: (Bound<usize>, Bound<usize>),
        #[case] step: usize,
        #[case] expected: Vec<i32>,
    ) {
        let vector: PersistentVector<i32> = (0..10).collect();
        let stepped = vector.slice_step(range, step).unwrap();
        assert_eq!(stepped.iter().copied().collect::<Vec<_>>(), expected);
    }

    #[rstest]
    fn test_slice_step_rejects_zero() {
        let vector: PersistentVector<i32> = (0..10).collect();
        assert!(matches!(
            vector.slice_step(.., 0),
            Err(CollectionError::InvalidArgument { .. })
        ));
    }

    // =========================================================================
    // Transient Tests
    // =========================================================================

    #[rstest]
    fn test_extend_does_not_touch_source() {
        let base: PersistentVector<i32> = (0..31).collect();
        let first = base.extend(31..100);
        let second = base.extend(1000..1005);

        assert_eq!(base, (0..31).collect::<PersistentVector<_>>());
        assert_eq!(first, (0..100).collect::<PersistentVector<_>>());
        assert_eq!(second, (0..31).chain(1000..1005).collect::<PersistentVector<_>>());
    }

    #[rstest]
    fn test_transient_set_copies_shared_leaves() {
        let original: PersistentVector<i32> = (0..100).collect();
        let mut transient = original.clone().transient();
        transient.set(5, -5).unwrap();
        transient.set(99, -99).unwrap();
        let updated = transient.persistent();

        assert_eq!(original.get(5), Some(&5));
        assert_eq!(original.get(99), Some(&99));
        assert_eq!(updated.get(5), Some(&-5));
        assert_eq!(updated.get(99), Some(&-99));
    }

    #[rstest]
    fn test_transient_set_out_of_range() {
        let mut transient: TransientVector<i32> = TransientVector::new();
        assert_eq!(
            transient.set(0, 1),
            Err(CollectionError::IndexOutOfRange { index: 0, length: 0 })
        );
    }

    #[rstest]
    fn test_transient_get_spans_root_and_tail() {
        let mut transient = TransientVector::new();
        transient.extend(0..70);
        assert_eq!(transient.len(), 70);
        assert_eq!(transient.get(10), Some(&10));
        assert_eq!(transient.get(69), Some(&69));
        assert_eq!(transient.get(70), None);
    }

    // =========================================================================
    // Iterator Tests
    // =========================================================================

    #[rstest]
    fn test_iter_double_ended() {
        let vector: PersistentVector<i32> = (0..70).collect();
        let reversed: Vec<i32> = vector.iter().rev().copied().collect();
        assert_eq!(reversed, (0..70).rev().collect::<Vec<_>>());

        let mut iter = vector.iter();
        assert_eq!(iter.next(), Some(&0));
        assert_eq!(iter.next_back(), Some(&69));
        assert_eq!(iter.len(), 68);
    }

    #[rstest]
    fn test_into_iter_owned() {
        let vector: PersistentVector<String> =
            ["a", "b", "c"].iter().map(ToString::to_string).collect();
        let collected: Vec<String> = vector.into_iter().collect();
        assert_eq!(collected, vec!["a", "b", "c"]);
    }

    // =========================================================================
    // Comparison Tests
    // =========================================================================

    #[rstest]
    #[case(&[1, 2, 3], &[1, 2, 4], Ordering::Less)]
    #[case(&[1, 2], &[1, 2, 0], Ordering::Less)]
    #[case(&[2], &[1, 9, 9], Ordering::Greater)]
    #[case(&[], &[], Ordering::Equal)]
    fn test_ordering_is_lexicographic(
        #[case] left: &[i32],
        #[case] right: &[i32],
        #[case] expected: Ordering,
    ) {
        let left = PersistentVector::from_slice(left);
        let right = PersistentVector::from_slice(right);
        assert_eq!(left.cmp(&right), expected);
    }

    #[rstest]
    fn test_add_concatenates() {
        let left = PersistentVector::from_slice(&[1, 2]);
        let right = PersistentVector::from_slice(&[3]);
        assert_eq!(&left + &right, PersistentVector::from_slice(&[1, 2, 3]));
        assert_eq!(left + right, PersistentVector::from_slice(&[1, 2, 3]));
    }
}

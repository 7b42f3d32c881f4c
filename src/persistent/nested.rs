//! Nested collections addressed by key paths.
//!
//! `assoc_in` on [`PersistentVector`] and [`PersistentHashMap`] walks a path
//! of keys into values that are themselves collections. Two traits make that
//! possible without tying the collections to one value type:
//!
//! - [`PathKey`]: a key that may double as a sequence index
//! - [`Nested`]: a value that can be updated along a path
//!
//! [`Value`] is a ready-made dynamic tree of scalars, vectors and maps keyed
//! by [`Key`].
//!
//! # Examples
//!
//! ```rust
//! use persistent_collections::persistent::{Key, PersistentHashMap, Value};
//!
//! let config: PersistentHashMap<Key, Value<i64>> = PersistentHashMap::new();
//! let config = config
//!     .assoc_in(&["server".into(), "port".into()], Value::Scalar(8080))
//!     .unwrap();
//!
//! let Some(Value::Map(server)) = config.get(&Key::from("server")) else {
//!     panic!("server section missing");
//! };
//! assert_eq!(server.get(&Key::from("port")), Some(&Value::Scalar(8080)));
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use super::{PersistentHashMap, PersistentVector};
use crate::error::CollectionError;

/// A path component.
///
/// Integral keys can address a sequence position; every other key yields
/// `None` and is rejected with [`CollectionError::InvalidArgument`] when a
/// sequence needs an index.
pub trait PathKey: fmt::Debug {
    /// Returns this key as a sequence index, if it is integral.
    fn as_index(&self) -> Option<isize>;
}

macro_rules! impl_integral_path_key {
    ($($integer:ty),* $(,)?) => {
        $(
            impl PathKey for $integer {
                #[inline]
                fn as_index(&self) -> Option<isize> {
                    isize::try_from(*self).ok()
                }
            }
        )*
    };
}

impl_integral_path_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl PathKey for str {
    #[inline]
    fn as_index(&self) -> Option<isize> {
        None
    }
}

impl PathKey for String {
    #[inline]
    fn as_index(&self) -> Option<isize> {
        None
    }
}

impl<K: PathKey + ?Sized> PathKey for &K {
    #[inline]
    fn as_index(&self) -> Option<isize> {
        (**self).as_index()
    }
}

/// A value that can be updated along a key path.
pub trait Nested<K>: Clone {
    /// The value used for an intermediate level that does not exist yet.
    ///
    /// Missing levels are always created as empty mappings.
    fn empty_nested() -> Self;

    /// Returns a copy of `self` with the value at `path` set to `value`.
    ///
    /// An empty path returns `self` unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::InvalidArgument`] when the path cannot be
    /// followed, and [`CollectionError::IndexOutOfRange`] for a sequence index
    /// outside `[0, len]`.
    fn assoc_in(&self, path: &[K], value: Self) -> Result<Self, CollectionError>;
}

// =============================================================================
// Key
// =============================================================================

/// A key of a [`Value`] tree: either a position or a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// A sequence position; negative counts from the end
    Index(isize),
    /// A mapping key
    Name(String),
}

impl PathKey for Key {
    fn as_index(&self) -> Option<isize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Name(_) => None,
        }
    }
}

impl From<isize> for Key {
    fn from(index: isize) -> Self {
        Self::Index(index)
    }
}

impl From<i32> for Key {
    fn from(index: i32) -> Self {
        let index =
            isize::try_from(index).unwrap_or(if index < 0 { isize::MIN } else { isize::MAX });
        Self::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(formatter, "{index}"),
            Self::Name(name) => write!(formatter, "{name:?}"),
        }
    }
}

// =============================================================================
// Value
// =============================================================================

/// A dynamically shaped tree of persistent collections.
///
/// # Examples
///
/// ```rust
/// use persistent_collections::persistent::{Key, PersistentVector, Value};
///
/// let rows: PersistentVector<Value<&str>> = PersistentVector::new();
/// let rows = rows
///     .assoc_in(&[Key::Index(0), Key::from("name")], Value::Scalar("first"))
///     .unwrap();
///
/// assert_eq!(rows.len(), 1);
/// assert!(matches!(rows.get(0), Some(Value::Map(_))));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value<S> {
    /// A leaf value
    Scalar(S),
    /// A sequence of values
    Vector(PersistentVector<Value<S>>),
    /// A mapping from keys to values
    Map(PersistentHashMap<Key, Value<S>>),
}

impl<S> Value<S> {
    /// Returns the scalar, if this is one.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&S> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Returns the vector, if this is one.
    #[must_use]
    pub const fn as_vector(&self) -> Option<&PersistentVector<Self>> {
        match self {
            Self::Vector(vector) => Some(vector),
            _ => None,
        }
    }

    /// Returns the map, if this is one.
    #[must_use]
    pub const fn as_map(&self) -> Option<&PersistentHashMap<Key, Self>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Vector(_) => "vector",
            Self::Map(_) => "map",
        }
    }
}

impl<S: PartialOrd> Value<S> {
    /// Compares two values, reporting incomparable pairs as an error.
    ///
    /// Scalars compare by `S`'s ordering and vectors lexicographically. Maps
    /// have no ordering and values of different kinds are not comparable.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::Unsupported`] for maps, for mismatched
    /// kinds, and for scalars that `S` itself cannot order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::cmp::Ordering;
    /// use persistent_collections::persistent::{PersistentVector, Value};
    ///
    /// let low = Value::Vector(PersistentVector::from_slice(&[Value::Scalar(1)]));
    /// let high = Value::Vector(PersistentVector::from_slice(&[Value::Scalar(2)]));
    /// assert_eq!(low.try_compare(&high), Ok(Ordering::Less));
    /// assert!(low.try_compare(&Value::Scalar(1)).is_err());
    /// ```
    pub fn try_compare(&self, other: &Self) -> Result<Ordering, CollectionError> {
        const UNSUPPORTED: CollectionError = CollectionError::Unsupported {
            operation: "ordering",
        };

        match (self, other) {
            (Self::Scalar(left), Self::Scalar(right)) => left.partial_cmp(right).ok_or(UNSUPPORTED),
            (Self::Vector(left), Self::Vector(right)) => {
                for (left_element, right_element) in left.iter().zip(right.iter()) {
                    match left_element.try_compare(right_element)? {
                        Ordering::Equal => {}
                        ordering => return Ok(ordering),
                    }
                }
                Ok(left.len().cmp(&right.len()))
            }
            _ => Err(UNSUPPORTED),
        }
    }
}

impl<S: Clone + PartialEq> Nested<Key> for Value<S> {
    fn empty_nested() -> Self {
        Self::Map(PersistentHashMap::new())
    }

    fn assoc_in(&self, path: &[Key], value: Self) -> Result<Self, CollectionError> {
        match self {
            Self::Vector(vector) => vector.assoc_in(path, value).map(Self::Vector),
            Self::Map(map) => map.assoc_in(path, value).map(Self::Map),
            Self::Scalar(_) if path.is_empty() => Ok(self.clone()),
            Self::Scalar(_) => Err(CollectionError::invalid_argument(format!(
                "cannot descend into a {} with key {}",
                self.kind(),
                path[0]
            ))),
        }
    }
}

impl<S> From<S> for Value<S> {
    fn from(scalar: S) -> Self {
        Self::Scalar(scalar)
    }
}

// =============================================================================
// Plain
// =============================================================================

/// A nested value built from standard, mutable collections.
///
/// Converting a `Plain` into a [`Value`] replaces every list and dict at every
/// depth with its persistent counterpart.
///
/// # Examples
///
/// ```rust
/// use persistent_collections::persistent::{Plain, Value};
///
/// let plain = Plain::List(vec![Plain::Scalar(1), Plain::List(vec![Plain::Scalar(2)])]);
/// let value = Value::from_plain(plain);
///
/// let outer = value.as_vector().unwrap();
/// assert!(matches!(outer.get(1), Some(Value::Vector(_))));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plain<S> {
    /// A leaf value
    Scalar(S),
    /// A standard vector of nested values
    List(Vec<Plain<S>>),
    /// A standard hash map of nested values
    Dict(HashMap<Key, Plain<S>>),
}

impl<S: Clone> Value<S> {
    /// Converts `plain` into a persistent tree, recursing into every list and
    /// dict.
    #[must_use]
    pub fn from_plain(plain: Plain<S>) -> Self {
        match plain {
            Plain::Scalar(scalar) => Self::Scalar(scalar),
            Plain::List(items) => Self::Vector(items.into_iter().map(Self::from_plain).collect()),
            Plain::Dict(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, item)| (key, Self::from_plain(item)))
                    .collect(),
            ),
        }
    }
}

impl<S: Clone> PersistentVector<Value<S>> {
    /// Appends `plain` after converting it with [`Value::from_plain`].
    #[must_use]
    pub fn push_back_plain(&self, plain: Plain<S>) -> Self {
        self.push_back(Value::from_plain(plain))
    }

    /// Appends every item of `items`, each converted with
    /// [`Value::from_plain`].
    #[must_use]
    pub fn extend_plain<I>(&self, items: I) -> Self
    where
        I: IntoIterator<Item = Plain<S>>,
    {
        self.extend(items.into_iter().map(Value::from_plain))
    }
}

impl<S: Clone + PartialEq> PersistentHashMap<Key, Value<S>> {
    /// Binds `key` to `plain` after converting it with [`Value::from_plain`].
    #[must_use]
    pub fn assoc_plain(&self, key: Key, plain: Plain<S>) -> Self {
        self.assoc(key, Value::from_plain(plain))
    }
}

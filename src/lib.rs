//! # persistent-collections
//!
//! Persistent (immutable, structurally shared) collections for Rust.
//!
//! ## Overview
//!
//! Every operation that looks like a mutation returns a new collection value.
//! Earlier values stay valid and unchanged, and old and new values share as
//! much of their internal structure as possible.
//!
//! - **`PersistentVector`**: indexed sequence built on a 32-way trie plus a
//!   tail buffer
//! - **`PersistentHashMap`**: hash map whose bucket array is itself a
//!   `PersistentVector` of collision chains
//! - **`PersistentHashSet`**: hash set backed by `PersistentHashMap<T, ()>`
//! - **Transients**: single-owner builders that update in place before being
//!   frozen into a persistent value
//! - **Collection traits**: `IndexedCollection`, `AssociativeCollection` and
//!   `SetCollection`
//!
//! ## Feature Flags
//!
//! - `arc` (default): share nodes through `Arc` so collections are
//!   `Send + Sync`; without it nodes use `Rc`
//! - `serde`: `Serialize`/`Deserialize` for the collections
//! - `fxhash`: hash keys with `rustc-hash`'s `FxHasher`
//! - `ahash`: hash keys with `ahash`'s `AHasher`
//!
//! ## Example
//!
//! ```rust
//! use persistent_collections::prelude::*;
//!
//! let vector = PersistentVector::new().push_back(1).push_back(2).push_back(3);
//! let updated = vector.assoc(1, 99).unwrap();
//! assert_eq!(updated, PersistentVector::from_slice(&[1, 99, 3]));
//! assert_eq!(vector, PersistentVector::from_slice(&[1, 2, 3]));
//!
//! let set: PersistentHashSet<i32> = [1, 2, 3, 1].into_iter().collect();
//! assert_eq!(set.len(), 3);
//! assert_eq!(set.remove(&99), Err(CollectionError::KeyNotFound));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports the collections, the collection traits and the error type.
///
/// # Usage
///
/// ```rust
/// use persistent_collections::prelude::*;
/// ```
pub mod prelude {
    pub use crate::collection::*;
    pub use crate::error::CollectionError;
    pub use crate::persistent::*;
}

pub mod collection;
pub mod error;
pub mod persistent;

pub use error::CollectionError;

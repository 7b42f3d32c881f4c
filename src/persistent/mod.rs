//! Persistent (immutable) data structures.
//!
//! This module provides immutable collections that use structural sharing to
//! minimize copying:
//!
//! - [`PersistentVector`]: indexed sequence (32-way trie with a tail buffer)
//! - [`PersistentHashMap`]: hash map whose bucket array is a `PersistentVector`
//! - [`PersistentHashSet`]: hash set backed by `PersistentHashMap<T, ()>`
//!
//! Each has a transient counterpart ([`TransientVector`], [`TransientHashMap`],
//! [`TransientHashSet`]) for building a new version in place before freezing
//! it.
//!
//! # Structural Sharing
//!
//! An update copies only the nodes on one root-to-leaf path and shares every
//! other node with the version it was derived from. Old versions stay valid
//! for as long as anyone holds them.
//!
//! # Examples
//!
//! ## `PersistentVector`
//!
//! ```rust
//! use persistent_collections::persistent::PersistentVector;
//!
//! let vector: PersistentVector<i32> = (0..100).collect();
//! let updated = vector.assoc(50, 999).unwrap();
//! assert_eq!(vector.get(50), Some(&50));
//! assert_eq!(updated.get(50), Some(&999));
//! ```
//!
//! ## `PersistentHashMap`
//!
//! ```rust
//! use persistent_collections::persistent::PersistentHashMap;
//!
//! let map = PersistentHashMap::new().assoc("a", 1).assoc("b", 3);
//! let updated = map.assoc("c", 3).dissoc("a");
//!
//! assert_eq!(updated.len(), 2);
//! assert_eq!(updated.get("b"), Some(&3));
//! assert_eq!(map.get("a"), Some(&1));
//! ```
//!
//! ## `PersistentHashSet`
//!
//! ```rust
//! use persistent_collections::persistent::PersistentHashSet;
//!
//! let set: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
//! assert!(set.contains(&2));
//! assert!(!set.discard(&2).contains(&2));
//! ```

/// Reference-counted pointer used for every shared node.
///
/// When the `arc` feature is enabled (the default), this is
/// `std::sync::Arc` and collections can be shared across threads.
///
/// When the `arc` feature is disabled, this is `std::rc::Rc`, which is
/// cheaper but confined to one thread.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod hashmap;
mod hashset;
mod nested;
mod node;
mod vector;

pub use hashmap::PersistentHashMap;
pub use hashmap::PersistentHashMapIntoIterator;
pub use hashmap::PersistentHashMapIterator;
pub use hashmap::TransientHashMap;
pub use hashset::PersistentHashSet;
pub use hashset::PersistentHashSetIntoIterator;
pub use hashset::PersistentHashSetIterator;
pub use hashset::TransientHashSet;
pub use nested::Key;
pub use nested::Nested;
pub use nested::PathKey;
pub use nested::Plain;
pub use nested::Value;
pub use vector::PersistentVector;
pub use vector::PersistentVectorIntoIterator;
pub use vector::PersistentVectorIterator;
pub use vector::TransientVector;

#[cfg(test)]
mod reference_counter_tests {
    use super::ReferenceCounter;
    use rstest::rstest;

    #[rstest]
    fn test_make_mut_copies_only_when_shared() {
        let mut unique: ReferenceCounter<Vec<i32>> = ReferenceCounter::new(vec![1]);
        ReferenceCounter::make_mut(&mut unique).push(2);
        assert_eq!(*unique, vec![1, 2]);

        let shared = unique.clone();
        ReferenceCounter::make_mut(&mut unique).push(3);
        assert_eq!(*shared, vec![1, 2]);
        assert_eq!(*unique, vec![1, 2, 3]);
        assert_eq!(ReferenceCounter::strong_count(&shared), 1);
    }

    #[cfg(feature = "arc")]
    #[rstest]
    fn test_arc_feature_makes_collections_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<super::PersistentVector<i32>>();
        assert_send_sync::<super::PersistentHashMap<String, i32>>();
        assert_send_sync::<super::PersistentHashSet<u64>>();
    }
}

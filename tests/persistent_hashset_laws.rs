//! Property-based tests for `PersistentHashSet` laws.
//!
//! The set algebra is checked against `std::collections::HashSet`.

use persistent_collections::prelude::*;
use proptest::prelude::*;
use std::collections::HashSet;

fn arbitrary_elements() -> impl Strategy<Value = Vec<i16>> {
    prop::collection::vec(-200i16..200, 0..150)
}

fn to_model(set: &PersistentHashSet<i16>) -> HashSet<i16> {
    set.iter().copied().collect()
}

// =============================================================================
// Membership Laws
// =============================================================================

proptest! {
    #[test]
    fn prop_add_contains_law(elements in arbitrary_elements(), element: i16) {
        let set: PersistentHashSet<i16> = elements.into_iter().collect();
        prop_assert!(set.add(element).contains(&element));
    }

    #[test]
    fn prop_discard_contains_law(elements in arbitrary_elements(), element: i16) {
        let set: PersistentHashSet<i16> = elements.into_iter().collect();
        prop_assert!(!set.discard(&element).contains(&element));
    }

    #[test]
    fn prop_remove_fails_only_when_absent(elements in arbitrary_elements(), element: i16) {
        let set: PersistentHashSet<i16> = elements.into_iter().collect();
        match set.remove(&element) {
            Ok(removed) => {
                prop_assert!(set.contains(&element));
                prop_assert_eq!(removed.len(), set.len() - 1);
            }
            Err(error) => {
                prop_assert_eq!(error, CollectionError::KeyNotFound);
                prop_assert!(!set.contains(&element));
            }
        }
    }

    #[test]
    fn prop_size_counts_distinct_elements(elements in arbitrary_elements()) {
        let distinct: HashSet<i16> = elements.iter().copied().collect();
        let set: PersistentHashSet<i16> = elements.into_iter().collect();
        prop_assert_eq!(set.len(), distinct.len());
        prop_assert_eq!(to_model(&set), distinct);
    }
}

// =============================================================================
// Algebra Laws
// =============================================================================

proptest! {
    #[test]
    fn prop_algebra_matches_std(left in arbitrary_elements(), right in arbitrary_elements()) {
        let left_model: HashSet<i16> = left.iter().copied().collect();
        let right_model: HashSet<i16> = right.iter().copied().collect();
        let left_set: PersistentHashSet<i16> = left.into_iter().collect();
        let right_set: PersistentHashSet<i16> = right.into_iter().collect();

        prop_assert_eq!(to_model(&(&left_set | &right_set)), &left_model | &right_model);
        prop_assert_eq!(to_model(&(&left_set & &right_set)), &left_model & &right_model);
        prop_assert_eq!(to_model(&(&left_set - &right_set)), &left_model - &right_model);
        prop_assert_eq!(to_model(&(&left_set ^ &right_set)), &left_model ^ &right_model);
        prop_assert_eq!(left_set.is_subset(&right_set), left_model.is_subset(&right_model));
        prop_assert_eq!(left_set.is_disjoint(&right_set), left_model.is_disjoint(&right_model));
    }

    #[test]
    fn prop_union_is_commutative(left in arbitrary_elements(), right in arbitrary_elements()) {
        let left_set: PersistentHashSet<i16> = left.into_iter().collect();
        let right_set: PersistentHashSet<i16> = right.into_iter().collect();
        prop_assert_eq!(left_set.union(&right_set), right_set.union(&left_set));
    }

    #[test]
    fn prop_intersection_is_subset_of_both(left in arbitrary_elements(), right in arbitrary_elements()) {
        let left_set: PersistentHashSet<i16> = left.into_iter().collect();
        let right_set: PersistentHashSet<i16> = right.into_iter().collect();
        let common = left_set.intersection(&right_set);

        prop_assert!(common.is_subset(&left_set));
        prop_assert!(common.is_subset(&right_set));
        prop_assert!(common <= left_set);
    }

    #[test]
    fn prop_difference_and_intersection_partition(left in arbitrary_elements(), right in arbitrary_elements()) {
        let left_set: PersistentHashSet<i16> = left.into_iter().collect();
        let right_set: PersistentHashSet<i16> = right.into_iter().collect();

        let only_left = left_set.difference(&right_set);
        let common = left_set.intersection(&right_set);

        prop_assert!(only_left.is_disjoint(&common));
        prop_assert_eq!(only_left.union(&common), left_set);
    }
}

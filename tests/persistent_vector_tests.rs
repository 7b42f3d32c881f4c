//! Integration tests for `PersistentVector`.
//!
//! Exercises the public API across the trie boundaries (31/32/33 elements,
//! 1023/1024/1025 elements, and the point where the root grows a third
//! level) as well as the persistence guarantees.

#![allow(clippy::cast_possible_wrap)]

use persistent_collections::prelude::*;
use rstest::rstest;

// =============================================================================
// Basic Scenario
// =============================================================================

#[rstest]
fn test_push_back_then_assoc_leaves_original_untouched() {
    let original = PersistentVector::new().push_back(1).push_back(2).push_back(3);
    let updated = original.assoc(1, 99).unwrap();

    assert_eq!(original.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(updated.iter().copied().collect::<Vec<_>>(), vec![1, 99, 3]);
    assert_eq!(original.len(), 3);
    assert_eq!(updated.len(), 3);
}

#[rstest]
fn test_empty_vectors_are_all_equal() {
    let first: PersistentVector<i32> = PersistentVector::new();
    let second: PersistentVector<i32> = PersistentVector::default();
    let third: PersistentVector<i32> = std::iter::empty().collect();

    assert_eq!(first, second);
    assert_eq!(second, third);
    assert!(first.is_empty());
    assert_eq!(first.first(), None);
    assert_eq!(first.last(), None);
}

// =============================================================================
// Trie Boundaries
// =============================================================================

#[rstest]
#[case(1)]
#[case(31)]
#[case(32)]
#[case(33)]
#[case(64)]
#[case(65)]
#[case(1023)]
#[case(1024)]
#[case(1025)]
#[case(1056)]
#[case(1057)]
#[case(32_800)]
fn test_push_back_preserves_every_element(#[case] size: usize) {
    let vector = (0..size).fold(PersistentVector::new(), |accumulator, value| {
        accumulator.push_back(value)
    });

    assert_eq!(vector.len(), size);
    for index in 0..size {
        assert_eq!(vector.get(index), Some(&index), "element {index} of {size}");
    }
    assert_eq!(vector.get(size), None);
    assert!(vector.iter().copied().eq(0..size));
}

#[rstest]
#[case(32)]
#[case(33)]
#[case(1024)]
#[case(1025)]
#[case(1057)]
fn test_assoc_at_every_boundary_index(#[case] size: usize) {
    let vector: PersistentVector<usize> = (0..size).collect();

    for index in [0, 31, 32, size / 2, size - 1] {
        if index >= size {
            continue;
        }
        let updated = vector.assoc(index as isize, usize::MAX).unwrap();
        assert_eq!(updated.get(index), Some(&usize::MAX));
        assert_eq!(vector.get(index), Some(&index));
        assert_eq!(updated.len(), size);
    }
}

#[rstest]
fn test_collect_and_fold_agree_past_ten_thousand() {
    let folded = (0..12_345).fold(PersistentVector::new(), |accumulator, value| {
        accumulator.push_back(value)
    });
    let collected: PersistentVector<i32> = (0..12_345).collect();
    let from_slice = PersistentVector::from_slice(&(0..12_345).collect::<Vec<_>>());

    assert_eq!(folded, collected);
    assert_eq!(collected, from_slice);
    assert_eq!(collected.last(), Some(&12_344));
}

// =============================================================================
// Indexing
// =============================================================================

#[rstest]
#[case(-1, Ok(5))]
#[case(-5, Ok(1))]
#[case(0, Ok(1))]
#[case(4, Ok(5))]
#[case(5, Err(CollectionError::IndexOutOfRange { index: 5, length: 5 }))]
#[case(-6, Err(CollectionError::IndexOutOfRange { index: -6, length: 5 }))]
fn test_lookup_supports_negative_indices(
    #[case] index: isize,
    #[case] expected: Result<i32, CollectionError>,
) {
    let vector = PersistentVector::from_slice(&[1, 2, 3, 4, 5]);
    assert_eq!(vector.lookup(index).copied(), expected);
}

#[rstest]
fn test_assoc_at_length_appends() {
    let vector = PersistentVector::from_slice(&[1, 2]);
    let appended = vector.assoc(2, 3).unwrap();

    assert_eq!(appended, PersistentVector::from_slice(&[1, 2, 3]));
    assert_eq!(
        vector.assoc(3, 4),
        Err(CollectionError::IndexOutOfRange { index: 3, length: 2 })
    );
}

#[rstest]
fn test_assoc_negative_index_replaces_from_end() {
    let vector = PersistentVector::from_slice(&[1, 2, 3]);
    assert_eq!(
        vector.assoc(-1, 30).unwrap(),
        PersistentVector::from_slice(&[1, 2, 30])
    );
}

#[rstest]
#[should_panic(expected = "index out of bounds")]
fn test_index_operator_panics_out_of_range() {
    let vector = PersistentVector::from_slice(&[1, 2, 3]);
    let _ = vector[3];
}

// =============================================================================
// Derived Operations
// =============================================================================

#[rstest]
fn test_slice_and_concatenation() {
    let vector: PersistentVector<i32> = (0..100).collect();

    let head = vector.slice(..40);
    let rest = vector.slice(40..);
    assert_eq!(head.len(), 40);
    assert_eq!(rest.len(), 60);
    assert_eq!(&head + &rest, vector);
    assert_eq!(vector.slice(90..200).len(), 10);
    let (start, end) = (50, 10);
    assert!(vector.slice(start..end).is_empty());
    assert_eq!(
        vector.slice_step(start.., 20).unwrap(),
        PersistentVector::from_slice(&[50, 70, 90])
    );
}

#[rstest]
fn test_repeat_and_extend() {
    let vector = PersistentVector::from_slice(&[1, 2]);

    assert_eq!(vector.repeat(3), PersistentVector::from_slice(&[1, 2, 1, 2, 1, 2]));
    assert!(vector.repeat(0).is_empty());
    assert_eq!(vector.extend(3..6), PersistentVector::from_slice(&[1, 2, 3, 4, 5]));
    assert_eq!(vector.len(), 2);
}

#[rstest]
fn test_search_operations() {
    let vector = PersistentVector::from_slice(&[5, 1, 5, 2, 5]);

    assert_eq!(vector.index_of(&5), Some(0));
    assert_eq!(vector.index_of_within(&5, 1..), Some(2));
    assert_eq!(vector.index_of_within(&5, 3..4), None);
    assert_eq!(vector.count_of(&5), 3);
    assert!(vector.contains_element(&2));
    assert!(!vector.contains_element(&9));
}

#[rstest]
fn test_ordering_is_lexicographic() {
    let shorter = PersistentVector::from_slice(&[1, 2]);
    let longer = PersistentVector::from_slice(&[1, 2, 0]);
    let bigger = PersistentVector::from_slice(&[1, 3]);

    assert!(shorter < longer);
    assert!(longer < bigger);
    assert_eq!(shorter.cmp(&shorter.clone()), std::cmp::Ordering::Equal);
}

#[rstest]
fn test_display_and_debug() {
    let vector = PersistentVector::from_slice(&[1, 2, 3]);
    assert_eq!(format!("{vector}"), "[1, 2, 3]");
    assert_eq!(format!("{vector:?}"), "[1, 2, 3]");
}

#[rstest]
fn test_reverse_iteration_crosses_chunks() {
    let vector: PersistentVector<i32> = (0..70).collect();
    let reversed: Vec<i32> = vector.iter().rev().copied().collect();

    assert_eq!(reversed, (0..70).rev().collect::<Vec<_>>());
    assert_eq!(vector.iter().len(), 70);
}

#[rstest]
fn test_owned_iteration() {
    let vector: PersistentVector<String> =
        ["a", "b", "c"].iter().map(|s| (*s).to_string()).collect();
    let joined: String = vector.into_iter().collect();
    assert_eq!(joined, "abc");
}

// =============================================================================
// Transient
// =============================================================================

#[rstest]
fn test_transient_does_not_affect_source() {
    let original: PersistentVector<i32> = (0..100).collect();

    let mut transient = original.clone().transient();
    for index in 0..100 {
        transient.set(index, -1).unwrap();
    }
    transient.extend(100..200);
    let rebuilt = transient.persistent();

    assert!(original.iter().copied().eq(0..100));
    assert_eq!(rebuilt.len(), 200);
    assert!(rebuilt.iter().take(100).all(|value| *value == -1));
    assert!(rebuilt.iter().skip(100).copied().eq(100..200));
}

#[rstest]
fn test_transient_set_out_of_range() {
    let mut transient = PersistentVector::from_slice(&[1]).transient();
    assert_eq!(
        transient.set(1, 2),
        Err(CollectionError::IndexOutOfRange { index: 1, length: 1 })
    );
}

// =============================================================================
// IndexedCollection
// =============================================================================

fn second_of<C: IndexedCollection>(collection: &C) -> Option<&C::Element> {
    collection.lookup(1).ok()
}

#[rstest]
fn test_vector_is_an_indexed_collection() {
    let vector = PersistentVector::from_slice(&['a', 'b']);
    assert_eq!(second_of(&vector), Some(&'b'));
    assert!(IndexedCollection::contains_element(&vector, &'a'));
    assert_eq!(IndexedCollection::elements(&vector).count(), 2);
}

//! Benchmark for the transient builders.
//!
//! Compares `TransientVector`, `TransientHashMap` and `TransientHashSet`
//! against building the same value one persistent update at a time.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use persistent_collections::persistent::{
    PersistentHashMap, PersistentHashSet, PersistentVector, TransientHashMap, TransientHashSet,
    TransientVector,
};
use std::hint::black_box;

// =============================================================================
// TransientVector Benchmarks
// =============================================================================

fn benchmark_transient_vector_push_back(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transient_vector_push_back");

    for size in [1_000, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::new("TransientVector", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut transient = TransientVector::new();
                    for index in 0..size {
                        transient.push_back(black_box(index));
                    }
                    black_box(transient.persistent())
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("PersistentVector", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut vector = PersistentVector::new();
                    for index in 0..size {
                        vector = vector.push_back(black_box(index));
                    }
                    black_box(vector)
                });
            },
        );
    }

    group.finish();
}

fn benchmark_transient_vector_set(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transient_vector_set");

    for size in [1_000, 10_000] {
        let source: PersistentVector<usize> = (0..size).collect();

        group.bench_with_input(
            BenchmarkId::new("TransientVector", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut transient = source.clone().transient();
                    for index in 0..size {
                        let _ = transient.set(index, black_box(index + 1));
                    }
                    black_box(transient.persistent())
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("PersistentVector", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut vector = source.clone();
                    for index in 0..size {
                        vector = vector.update(index, black_box(index + 1)).unwrap_or(vector);
                    }
                    black_box(vector)
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// TransientHashMap Benchmarks
// =============================================================================

fn benchmark_transient_hashmap_insert(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transient_hashmap_insert");

    for size in [1_000, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::new("TransientHashMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut transient = TransientHashMap::new();
                    for key in 0..size {
                        transient.insert(black_box(key), black_box(key * 2));
                    }
                    black_box(transient.persistent())
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("PersistentHashMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut map = PersistentHashMap::new();
                    for key in 0..size {
                        map = map.assoc(black_box(key), black_box(key * 2));
                    }
                    black_box(map)
                });
            },
        );
    }

    group.finish();
}

fn benchmark_transient_hashmap_remove(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transient_hashmap_remove");

    for size in [1_000, 10_000] {
        let source: PersistentHashMap<u64, u64> = (0..size).map(|key| (key, key)).collect();

        group.bench_with_input(
            BenchmarkId::new("TransientHashMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut transient = source.clone().transient();
                    for key in 0..size {
                        transient.remove(&black_box(key));
                    }
                    black_box(transient.persistent())
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// TransientHashSet Benchmarks
// =============================================================================

fn benchmark_transient_hashset_insert(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transient_hashset_insert");

    for size in [1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("TransientHashSet", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut transient = TransientHashSet::new();
                    for element in 0..size {
                        transient.insert(black_box(element));
                    }
                    black_box(transient.persistent())
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("PersistentHashSet", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut set = PersistentHashSet::new();
                    for element in 0..size {
                        set = set.add(black_box(element));
                    }
                    black_box(set)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_transient_vector_push_back,
    benchmark_transient_vector_set,
    benchmark_transient_hashmap_insert,
    benchmark_transient_hashmap_remove,
    benchmark_transient_hashset_insert,
);

criterion_main!(benches);

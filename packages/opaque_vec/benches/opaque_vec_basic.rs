//! Basic benchmarks for the `opaque_vec` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::time::Instant;

use criterion::{Criterion, criterion_group, criterion_main};
use opaque_vec::{OpaqueVec, TypedVec};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

const ITEM_COUNT: u32 = 1000;

/// Pseudo-random but repeatable values, so every sort sees the same input.
fn shuffled_values() -> Vec<u32> {
    let mut state = 0x2545_f491_u32;

    (0..ITEM_COUNT)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            state >> 8
        })
        .collect()
}

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("opaque_vec_basic");

    group.bench_function("build_empty", |b| {
        b.iter(|| drop(black_box(OpaqueVec::builder().item_size(8).build())));
    });

    group.bench_function("push_back_1000", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let mut vec = OpaqueVec::builder().item_size(4).build().unwrap();

                for value in 0..ITEM_COUNT {
                    vec.push_back(black_box(&value.to_le_bytes())).unwrap();
                }

                drop(black_box(vec));
            }

            start.elapsed()
        });
    });

    group.bench_function("push_front_1000", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let mut vec = TypedVec::<u32>::new().unwrap();

                for value in 0..ITEM_COUNT {
                    vec.push_front(black_box(value)).unwrap();
                }

                drop(black_box(vec));
            }

            start.elapsed()
        });
    });

    group.bench_function("pop_front_1000", |b| {
        b.iter_custom(|iters| {
            let values = shuffled_values();
            let mut vecs = (0..iters)
                .map(|_| {
                    let mut vec = TypedVec::<u32>::new().unwrap();
                    vec.push_back_slice(&values).unwrap();
                    vec
                })
                .collect::<Vec<_>>();

            let start = Instant::now();

            for vec in &mut vecs {
                while black_box(vec.pop_front()).is_some() {}
            }

            start.elapsed()
        });
    });

    group.bench_function("sort_1000", |b| {
        b.iter_custom(|iters| {
            let values = shuffled_values();
            let mut vecs = (0..iters)
                .map(|_| {
                    let mut vec = TypedVec::<u32>::new().unwrap();
                    vec.push_back_slice(&values).unwrap();
                    vec
                })
                .collect::<Vec<_>>();

            let start = Instant::now();

            for vec in &mut vecs {
                vec.sort_by(u32::cmp).unwrap();
            }

            start.elapsed()
        });
    });

    group.bench_function("find_last", |b| {
        let mut vec = OpaqueVec::builder().item_size(4).build().unwrap();
        for value in 0..ITEM_COUNT {
            vec.push_back(&value.to_le_bytes()).unwrap();
        }
        let needle = (ITEM_COUNT - 1).to_le_bytes();

        b.iter(|| {
            black_box(vec.find(black_box(&needle), |a, b| a.cmp(b)))
        });
    });

    group.finish();
}

//! Allocator throughput benchmarks.

use allotment::Size;
use allotment_benchmarks::{fill, uniform_locker_bank};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::{Arc, Barrier};
use std::thread;

/// Benchmark one full reserve, confirm, release cycle
fn bench_reservation_cycle(c: &mut Criterion) {
    let allocator = uniform_locker_bank(1_000);

    let mut group = c.benchmark_group("reservation_cycle");
    group.throughput(Throughput::Elements(1));

    group.bench_function("reserve_confirm_release", |b| {
        b.iter(|| {
            let token = allocator.reserve(black_box(Size::Small)).unwrap();
            allocator.confirm(&token).unwrap();
            allocator.release(token.resource_id()).unwrap();
        });
    });

    group.bench_function("reserve_cancel", |b| {
        b.iter(|| {
            let token = allocator.reserve(black_box(Size::Medium)).unwrap();
            allocator.cancel(&token).unwrap();
        });
    });

    group.finish();
}

/// Benchmark group reservations of increasing size
fn bench_reserve_many(c: &mut Criterion) {
    let allocator = uniform_locker_bank(1_000);

    let mut group = c.benchmark_group("reserve_many");

    for count in [1, 10, 100, 500] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("reserve_cancel", count), &count, |b, &n| {
            b.iter(|| {
                let tokens = allocator.reserve_many(Size::Large, n).unwrap();
                for token in &tokens {
                    allocator.cancel(token).unwrap();
                }
                black_box(tokens.len())
            });
        });
    }

    group.finish();
}

/// Benchmark the upgrade search when smaller pools are exhausted
fn bench_upgrade_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("upgrade_search");
    group.throughput(Throughput::Elements(1));

    for exhausted in [0_usize, 1, 2, 3] {
        let allocator = uniform_locker_bank(100);
        for size in Size::ALL.into_iter().take(exhausted) {
            fill(&allocator, size);
        }

        group.bench_with_input(
            BenchmarkId::new("exhausted_sizes", exhausted),
            &exhausted,
            |b, _| {
                b.iter(|| {
                    let token = allocator.reserve(Size::Small).unwrap();
                    allocator.cancel(&token).unwrap();
                });
            },
        );
    }

    group.finish();
}

/// Benchmark rejection when every compatible pool is full
fn bench_rejection(c: &mut Criterion) {
    let allocator = uniform_locker_bank(10);
    for size in Size::ALL {
        fill(&allocator, size);
    }

    c.bench_function("reject_no_capacity", |b| {
        b.iter(|| black_box(allocator.reserve(Size::Small).is_err()));
    });
}

/// Benchmark contended reservation from several threads
fn bench_contended_reserve(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_reserve");
    let rounds = 1_000;

    for threads in [2_usize, 4, 8] {
        group.throughput(Throughput::Elements((threads * rounds) as u64));

        group.bench_with_input(
            BenchmarkId::new("threads", threads),
            &threads,
            |b, &threads| {
                let allocator = Arc::new(uniform_locker_bank(64));
                b.iter(|| {
                    let barrier = Arc::new(Barrier::new(threads));
                    let handles: Vec<_> = (0..threads)
                        .map(|worker| {
                            let allocator = Arc::clone(&allocator);
                            let barrier = Arc::clone(&barrier);
                            thread::spawn(move || {
                                barrier.wait();
                                let size = Size::ALL[worker % Size::ALL.len()];
                                for _ in 0..rounds {
                                    if let Ok(token) = allocator.reserve(size) {
                                        allocator.cancel(&token).unwrap();
                                    }
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_reservation_cycle,
    bench_reserve_many,
    bench_upgrade_search,
    bench_rejection,
    bench_contended_reserve
);
criterion_main!(benches);

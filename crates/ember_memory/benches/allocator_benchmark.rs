//! # Allocator Hot Path Benchmark
//!
//! Measures the per-call cost of each strategy once its block is acquired.
//!
//! Run with: `cargo bench --package ember_memory`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ember_memory::{
    Allocator, Arena, ArenaConfig, FailurePolicy, PoolAllocator, PoolConfig, StackAllocator,
    StackConfig,
};

/// Allocations per measured iteration.
const ALLOCATIONS: usize = 10_000;

/// Benchmark: fill an arena with mixed-alignment requests, then reset.
fn bench_arena_frame(c: &mut Criterion) {
    let config = ArenaConfig::with_capacity(ALLOCATIONS * 64).policy(FailurePolicy::Relaxed);
    let mut arena = Arena::with_config(&config).unwrap();

    c.bench_function("arena_frame_10k", |b| {
        b.iter(|| {
            for i in 0..ALLOCATIONS {
                let align = 1 << (i % 5);
                black_box(arena.allocate(24, align).unwrap());
            }
            arena.reset();
        });
    });
}

/// Benchmark: nested marker scopes on a stack.
fn bench_stack_scopes(c: &mut Criterion) {
    let config = StackConfig::with_capacity(ALLOCATIONS * 32).policy(FailurePolicy::Relaxed);
    let mut stack = StackAllocator::with_config(&config).unwrap();

    c.bench_function("stack_scoped_10k", |b| {
        b.iter(|| {
            for _ in 0..ALLOCATIONS / 10 {
                let mut scope = stack.scope();
                for _ in 0..10 {
                    black_box(scope.allocate(16, 8).unwrap());
                }
            }
        });
    });
}

/// Benchmark: pool alloc/free churn at several pool sizes.
fn bench_pool_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_churn");

    for count in [64, 1_024, 16_384] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let config = PoolConfig::new(64, count)
                .detect_double_free(false)
                .policy(FailurePolicy::Relaxed);
            let mut pool = PoolAllocator::with_config(&config).unwrap();
            let mut live = Vec::with_capacity(count);

            b.iter(|| {
                while let Ok(chunk) = pool.allocate(64, 8) {
                    live.push(chunk);
                }
                for chunk in live.drain(..) {
                    pool.deallocate(chunk).unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_arena_frame, bench_stack_scopes, bench_pool_churn);
criterion_main!(benches);

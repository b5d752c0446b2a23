//! Criterion micro-benchmarks for aligned allocate/deallocate, container
//! growth, and scratch bump allocation.

use std::hint::black_box;

use allocator_api2::vec::Vec;
use criterion::{criterion_group, criterion_main, Criterion};
use lanealloc::scratch::AlignedScratch;
use lanealloc::{AlignedAllocator, Avx, Avx512, Sse};
use lanealloc_bench::{request_counts, row_widths};

/// Benchmark: allocate and release 1K mixed-size f32 blocks at each width.
fn bench_allocate_release(c: &mut Criterion) {
    let counts = request_counts(1024, 512, 42);

    c.bench_function("allocate_release_sse", |b| {
        let alloc = AlignedAllocator::<f32, Sse>::new();
        b.iter(|| {
            for &n in &counts {
                let ptr = alloc.allocate(n).unwrap();
                black_box(ptr);
                unsafe { alloc.deallocate(ptr, n) };
            }
        });
    });

    c.bench_function("allocate_release_avx512", |b| {
        let alloc = AlignedAllocator::<f32, Avx512>::new();
        b.iter(|| {
            for &n in &counts {
                let ptr = alloc.allocate(n).unwrap();
                black_box(ptr);
                unsafe { alloc.deallocate(ptr, n) };
            }
        });
    });

    c.bench_function("allocate_release_std_vec", |b| {
        b.iter(|| {
            for &n in &counts {
                let v: std::vec::Vec<f32> = std::vec::Vec::with_capacity(n);
                black_box(v.as_ptr());
            }
        });
    });
}

/// Benchmark: push 10K f32 values into a Vec backed by the aligned allocator.
fn bench_vec_push_10k(c: &mut Criterion) {
    c.bench_function("vec_push_10k_avx", |b| {
        b.iter(|| {
            let mut v = Vec::new_in(AlignedAllocator::<f32, Avx>::new());
            for i in 0..10_000 {
                v.push(i as f32);
            }
            black_box(v.len());
        });
    });
}

/// Benchmark: per-row RGB channel blocks from a reused scratch region.
fn bench_scratch_rows(c: &mut Criterion) {
    let widths = row_widths(256, 640);
    let mut scratch = AlignedScratch::<u8, Avx>::new(4096);

    c.bench_function("scratch_rows_256", |b| {
        b.iter(|| {
            for &w in &widths {
                scratch.reset();
                for channel in 0..3u8 {
                    let lane = scratch.alloc(w).unwrap();
                    lane.fill(channel);
                    black_box(lane.as_ptr());
                }
            }
        });
    });
}

criterion_group!(
    benches,
    bench_allocate_release,
    bench_vec_push_10k,
    bench_scratch_rows
);
criterion_main!(benches);

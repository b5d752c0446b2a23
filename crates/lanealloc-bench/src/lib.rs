//! Benchmark workloads for the lanealloc aligned allocator.
//!
//! - [`request_counts`]: deterministic mix of element counts, so every run
//!   allocates the same sequence of sizes.
//! - [`row_widths`]: per-row channel widths for the scratch workload.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Generate `n` element counts in `1..=max`.
///
/// Uses a fixed LCG seeded with `seed`; the same inputs always give the
/// same sequence.
pub fn request_counts(n: usize, max: usize, seed: u64) -> Vec<usize> {
    assert!(max > 0, "max must be non-zero");
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            1 + ((state >> 33) as usize) % max
        })
        .collect()
}

/// Widths of `rows` scanlines whose lengths cycle around `base`.
///
/// Odd offsets are included so lane rounding in the scratch allocator is
/// exercised.
pub fn row_widths(rows: usize, base: usize) -> Vec<usize> {
    (0..rows).map(|r| base + (r * 13) % 29).collect()
}

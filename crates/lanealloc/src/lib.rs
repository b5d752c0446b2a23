//! Over-aligned allocation for SIMD-friendly containers.
//!
//! Provides an allocator that returns memory aligned to the wider of an
//! element type's own alignment and the build's SIMD width, on top of a
//! general-purpose primitive that only guarantees its natural alignment.
//! This crate, unlike `lanealloc-core`, contains `unsafe` code; it is
//! confined to the `raw` module and the few items marked
//! `#[allow(unsafe_code)]`.
//!
//! # Architecture
//!
//! ```text
//! AlignedAllocator<T, S, P>   (zero-sized, typed, Allocator impl)
//! ├── AlignmentConfig          (resolved once per T from S and P)
//! ├── raw                      (pad, adjust, back-pointer store/load)
//! └── P: AllocPrimitive        (Global = std::alloc at natural alignment)
//!
//! SimdAllocated  ── per-type default allocator → SimdVec / SimdBox
//! AlignedScratch ── bump region of aligned lane blocks
//! ```
//!
//! # Padding
//!
//! When the required alignment exceeds the primitive's natural alignment,
//! each request is padded by the required alignment. The returned address
//! is the padded start rounded down to the required alignment, and the
//! original address is stored in the pointer-sized slot just below it.
//! Deallocation reads that slot back and releases the original address.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod allocator;
pub mod primitive;
mod raw;
pub mod registry;
pub mod scratch;

// Public re-exports for the primary API surface.
pub use allocator::AlignedAllocator;
pub use lanealloc_core::{
    AlignmentConfig, AllocError, Avx, Avx512, ConfigError, NativeSimd, Neon, NoSimd, SimdWidth,
    Sse, NATURAL_ALIGNMENT, POINTER_SIZE,
};
pub use primitive::{AllocPrimitive, Global};
pub use registry::{simd_box, simd_vec, simd_vec_with_capacity, SimdAllocated, SimdBox, SimdVec};
pub use scratch::AlignedScratch;

//! Core types for the lanealloc aligned allocator.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! compile-time alignment configuration shared by every allocator instance
//! and the single error type allocation can fail with.
//!
//! # Alignment model
//!
//! ```text
//! required = max(align_of::<T>(), SimdWidth::ALIGNMENT)
//! extra    = required if required > natural else 0
//! ```
//!
//! `natural` is whatever the underlying allocation primitive guarantees.
//! When `extra > 0` the allocator over-requests, shifts the address into
//! alignment and stores the original address in the pointer-sized slot just
//! below the returned address.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;

pub use config::{
    AlignmentConfig, Avx, Avx512, NativeSimd, Neon, NoSimd, SimdWidth, Sse, NATURAL_ALIGNMENT,
    POINTER_SIZE,
};
pub use error::{AllocError, ConfigError};

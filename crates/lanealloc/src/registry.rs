//! Per-type default allocator registration.
//!
//! An element type declares once which allocator its containers use by
//! implementing [`SimdAllocated`]. [`SimdVec`] and [`SimdBox`] then pick
//! that allocator up without the declaration site naming it.
//!
//! ```
//! use lanealloc::registry::{simd_vec, SimdAllocated, SimdVec};
//! use lanealloc::AlignedAllocator;
//!
//! #[derive(Clone, Copy, Default)]
//! struct Rgba([u8; 4]);
//!
//! impl SimdAllocated for Rgba {
//!     type Alloc = AlignedAllocator<Rgba>;
//! }
//!
//! let mut pixels: SimdVec<Rgba> = simd_vec();
//! pixels.push(Rgba([255, 0, 0, 255]));
//! ```

use allocator_api2::alloc::Allocator;
use allocator_api2::boxed::Box;
use allocator_api2::vec::Vec;

use crate::allocator::AlignedAllocator;

/// Element types whose containers default to a specific allocator.
pub trait SimdAllocated: Sized {
    /// Allocator used by [`SimdVec`] and [`SimdBox`] for this type.
    type Alloc: Allocator + Default + Clone;
}

/// A `Vec` using the allocator registered for `T`.
pub type SimdVec<T> = Vec<T, <T as SimdAllocated>::Alloc>;

/// A `Box` using the allocator registered for `T`.
pub type SimdBox<T> = Box<T, <T as SimdAllocated>::Alloc>;

/// An empty [`SimdVec`]. Does not allocate.
pub fn simd_vec<T: SimdAllocated>() -> SimdVec<T> {
    Vec::new_in(T::Alloc::default())
}

/// A [`SimdVec`] with room for at least `capacity` elements.
pub fn simd_vec_with_capacity<T: SimdAllocated>(capacity: usize) -> SimdVec<T> {
    Vec::with_capacity_in(capacity, T::Alloc::default())
}

/// Move `value` into a [`SimdBox`].
pub fn simd_box<T: SimdAllocated>(value: T) -> SimdBox<T> {
    Box::new_in(value, T::Alloc::default())
}

impl SimdAllocated for f32 {
    type Alloc = AlignedAllocator<f32>;
}

impl SimdAllocated for f64 {
    type Alloc = AlignedAllocator<f64>;
}

impl SimdAllocated for i32 {
    type Alloc = AlignedAllocator<i32>;
}

impl SimdAllocated for u32 {
    type Alloc = AlignedAllocator<u32>;
}

impl SimdAllocated for u8 {
    type Alloc = AlignedAllocator<u8>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanealloc_core::{Avx512, NativeSimd, SimdWidth};

    #[derive(Debug, PartialEq)]
    struct Lane([f32; 16]);

    impl SimdAllocated for Lane {
        type Alloc = AlignedAllocator<Lane, Avx512>;
    }

    #[test]
    fn registered_scalars_get_native_alignment() {
        let mut v: SimdVec<f32> = simd_vec();
        v.extend_from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(v.as_ptr() as usize % NativeSimd::ALIGNMENT.max(4), 0);
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn empty_vec_does_not_allocate() {
        let v: SimdVec<u8> = simd_vec();
        assert_eq!(v.capacity(), 0);
    }

    #[test]
    fn with_capacity_reserves() {
        let v: SimdVec<i32> = simd_vec_with_capacity(100);
        assert!(v.capacity() >= 100);
        assert_eq!(v.as_ptr() as usize % NativeSimd::ALIGNMENT.max(4), 0);
    }

    #[test]
    fn custom_registration_is_used_by_box_and_vec() {
        let boxed: SimdBox<Lane> = simd_box(Lane([1.0; 16]));
        let addr = &*boxed as *const Lane as usize;
        assert_eq!(addr % 64, 0);
        assert_eq!(boxed.0[15], 1.0);

        let mut lanes: SimdVec<Lane> = simd_vec_with_capacity(4);
        lanes.push(Lane([2.0; 16]));
        assert_eq!(lanes.as_ptr() as usize % 64, 0);
        assert_eq!(lanes[0], Lane([2.0; 16]));
    }
}

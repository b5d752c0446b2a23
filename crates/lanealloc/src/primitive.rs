//! The underlying allocation primitive.
//!
//! An [`AllocPrimitive`] is the general-purpose allocator the aligned
//! allocator sits on. It only has to guarantee its own natural alignment;
//! everything stricter is produced by padding and pointer adjustment in
//! the `raw` module.

use std::alloc::Layout;
use std::ptr::NonNull;

use lanealloc_core::{AllocError, NATURAL_ALIGNMENT};

/// A global allocate/deallocate pair with a fixed natural alignment.
///
/// The functions take no receiver: a primitive is a type, not a value, so
/// every allocator built on it stays zero-sized and stateless.
///
/// # Safety
///
/// Implementors must guarantee that:
///
/// - every pointer returned by [`allocate`](Self::allocate) is aligned to
///   [`NATURAL_ALIGNMENT`](Self::NATURAL_ALIGNMENT) and valid for reads and
///   writes of `size` bytes until it is passed to
///   [`deallocate`](Self::deallocate);
/// - live blocks never overlap;
/// - `allocate(0)` succeeds with a pointer that may be passed back to
///   `deallocate(_, 0)`;
/// - both functions are safe to call concurrently from multiple threads.
#[allow(unsafe_code)]
pub unsafe trait AllocPrimitive: 'static {
    /// Alignment of every block this primitive hands out.
    const NATURAL_ALIGNMENT: usize;

    /// Allocate `size` bytes.
    ///
    /// Failure is reported as [`AllocError::OutOfMemory`], never as a
    /// null pointer.
    fn allocate(size: usize) -> Result<NonNull<u8>, AllocError>;

    /// Release a block.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate(size)` on this primitive with the
    /// same `size`, and must not have been released already.
    unsafe fn deallocate(ptr: NonNull<u8>, size: usize);
}

/// The process-wide allocator from `std::alloc`.
///
/// Requests are made at [`NATURAL_ALIGNMENT`], mirroring a C `malloc`.
/// Zero-byte requests are rounded up to one byte so each one yields a
/// distinct pointer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Global;

impl Global {
    fn layout(size: usize) -> Result<Layout, AllocError> {
        Layout::from_size_align(size.max(1), NATURAL_ALIGNMENT).map_err(|_| {
            AllocError::OutOfMemory {
                requested: size,
                align: NATURAL_ALIGNMENT,
            }
        })
    }
}

#[allow(unsafe_code)]
// SAFETY: std::alloc honours the layout alignment, never overlaps live
// blocks, and is thread-safe. Zero sizes are rounded up to one byte.
unsafe impl AllocPrimitive for Global {
    const NATURAL_ALIGNMENT: usize = NATURAL_ALIGNMENT;

    fn allocate(size: usize) -> Result<NonNull<u8>, AllocError> {
        let layout = Self::layout(size)?;
        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| {
            log::warn!(
                "system allocator returned null for {} bytes (align {})",
                layout.size(),
                layout.align()
            );
            AllocError::OutOfMemory {
                requested: size,
                align: NATURAL_ALIGNMENT,
            }
        })
    }

    unsafe fn deallocate(ptr: NonNull<u8>, size: usize) {
        // `allocate(size)` succeeded, so the layout is valid.
        let Ok(layout) = Self::layout(size) else {
            return;
        };
        // SAFETY: the caller guarantees `ptr` came from `allocate(size)`,
        // which used this exact layout.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    #[test]
    fn global_allocations_are_naturally_aligned() {
        for size in [0usize, 1, 7, 64, 4096] {
            let ptr = Global::allocate(size).unwrap();
            assert_eq!(ptr.as_ptr() as usize % Global::NATURAL_ALIGNMENT, 0);
            unsafe { Global::deallocate(ptr, size) };
        }
    }

    #[test]
    fn zero_sized_requests_are_distinct() {
        let a = Global::allocate(0).unwrap();
        let b = Global::allocate(0).unwrap();
        assert_ne!(a, b);
        unsafe {
            Global::deallocate(a, 0);
            Global::deallocate(b, 0);
        }
    }

    #[test]
    fn oversized_request_is_out_of_memory() {
        let err = Global::allocate(usize::MAX).unwrap_err();
        assert!(matches!(err, AllocError::OutOfMemory { .. }));
    }
}

//! Reusable element types and a primitive that always fails.
//!
//! - [`Failing`]: refuses every request, counting attempts per thread.
//! - [`Narrow2`]: real blocks at a natural alignment too small to hold a
//!   back-pointer, counting calls per thread.
//! - [`Over64`]: element type whose own alignment (64) exceeds any natural
//!   alignment.
//! - [`Rgb24`]: 3-byte element type, for sizes that do not divide the
//!   alignment.

use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;

use lanealloc::{AllocError, AllocPrimitive};

thread_local! {
    static FAILED_ATTEMPTS: Cell<usize> = const { Cell::new(0) };
    static NARROW_CALLS: Cell<usize> = const { Cell::new(0) };
}

/// Primitive that is always out of memory.
#[derive(Clone, Copy, Debug, Default)]
pub struct Failing;

impl Failing {
    /// Requests refused on this thread so far.
    pub fn attempts() -> usize {
        FAILED_ATTEMPTS.with(Cell::get)
    }

    pub fn reset() {
        FAILED_ATTEMPTS.with(|c| c.set(0));
    }
}

// SAFETY: never hands out memory, so there is nothing to misalign or
// overlap.
unsafe impl AllocPrimitive for Failing {
    const NATURAL_ALIGNMENT: usize = 16;

    fn allocate(size: usize) -> Result<NonNull<u8>, AllocError> {
        FAILED_ATTEMPTS.with(|c| c.set(c.get() + 1));
        Err(AllocError::OutOfMemory {
            requested: size,
            align: Self::NATURAL_ALIGNMENT,
        })
    }

    unsafe fn deallocate(_ptr: NonNull<u8>, _size: usize) {
        panic!("Failing primitive never issues blocks");
    }
}

/// Primitive with a 2-byte natural alignment.
///
/// Fine for unpadded configurations. Any configuration that would need
/// padding is unsupported, so the aligned allocator must never call it
/// for one.
#[derive(Clone, Copy, Debug, Default)]
pub struct Narrow2;

impl Narrow2 {
    /// Allocations made on this thread so far.
    pub fn calls() -> usize {
        NARROW_CALLS.with(Cell::get)
    }

    pub fn reset() {
        NARROW_CALLS.with(|c| c.set(0));
    }

    fn layout(size: usize) -> Result<Layout, AllocError> {
        Layout::from_size_align(size.max(1), Self::NATURAL_ALIGNMENT).map_err(|_| {
            AllocError::OutOfMemory {
                requested: size,
                align: Self::NATURAL_ALIGNMENT,
            }
        })
    }
}

// SAFETY: blocks come from std::alloc at 2-byte alignment with at least
// one byte, so they are valid, distinct and thread-safe.
unsafe impl AllocPrimitive for Narrow2 {
    const NATURAL_ALIGNMENT: usize = 2;

    fn allocate(size: usize) -> Result<NonNull<u8>, AllocError> {
        NARROW_CALLS.with(|c| c.set(c.get() + 1));
        let layout = Self::layout(size)?;
        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError::OutOfMemory {
            requested: size,
            align: Self::NATURAL_ALIGNMENT,
        })
    }

    unsafe fn deallocate(ptr: NonNull<u8>, size: usize) {
        if let Ok(layout) = Self::layout(size) {
            // SAFETY: `ptr` came from `allocate(size)` with this layout.
            unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
        }
    }
}

/// A 64-byte-aligned, 64-byte element.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C, align(64))]
pub struct Over64 {
    pub lanes: [f32; 16],
}

impl Over64 {
    pub fn splat(value: f32) -> Self {
        Self {
            lanes: [value; 16],
        }
    }
}

/// A packed 24-bit pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Rgb24 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb24 {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

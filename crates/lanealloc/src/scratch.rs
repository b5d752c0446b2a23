//! Bump-allocated scratch space carved into SIMD-aligned lane blocks.
//!
//! [`AlignedScratch`] owns one block from an [`AlignedAllocator`] and hands
//! out slices whose first element sits on the required alignment, so each
//! slice can be loaded and stored with aligned vector instructions. A render
//! loop typically takes one block per colour channel per row and calls
//! [`reset`](AlignedScratch::reset) before the next row.

use std::ptr::NonNull;

use lanealloc_core::{NativeSimd, SimdWidth};

use crate::allocator::AlignedAllocator;
use crate::primitive::{AllocPrimitive, Global};

/// Minimum capacity (in elements) after the first growth.
const MIN_GROWTH: usize = 1024;

/// Bump-allocated, SIMD-aligned scratch space.
///
/// # Example
///
/// ```
/// use lanealloc::scratch::AlignedScratch;
///
/// let mut scratch = AlignedScratch::<u32>::new(64);
/// let red = scratch.alloc(8).unwrap();
/// red.fill(255);
/// let green = scratch.alloc(8).unwrap();
/// assert!(green.iter().all(|&g| g == 0));
/// scratch.reset();
/// ```
pub struct AlignedScratch<T: Copy + Default, S: SimdWidth = NativeSimd, P: AllocPrimitive = Global>
{
    /// Backing storage, fully initialised to `T::default()` or written data.
    block: NonNull<T>,
    /// Number of elements in `block`.
    capacity: usize,
    /// Bump pointer in elements.
    cursor: usize,
    alloc: AlignedAllocator<T, S, P>,
}

impl<T: Copy + Default, S: SimdWidth, P: AllocPrimitive> AlignedScratch<T, S, P> {
    /// Elements per alignment step: the smallest `k` with
    /// `k * size_of::<T>()` a multiple of the required alignment.
    const LANE: usize = lane_elements(
        std::mem::size_of::<T>(),
        AlignedAllocator::<T, S, P>::REQUIRED_ALIGNMENT,
    );

    /// Create a scratch region with room for `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if the initial block cannot be allocated. Use
    /// [`try_new`](Self::try_new) to handle that case.
    pub fn new(capacity: usize) -> Self {
        match Self::try_new(capacity) {
            Some(scratch) => scratch,
            None => panic!("failed to allocate {capacity} scratch elements"),
        }
    }

    /// Create a scratch region, or `None` if the system is out of memory.
    pub fn try_new(capacity: usize) -> Option<Self> {
        let alloc = AlignedAllocator::new();
        let block = Self::fresh_block(&alloc, capacity)?;
        Some(Self {
            block,
            capacity,
            cursor: 0,
            alloc,
        })
    }

    /// Allocate `len` elements aligned to the required alignment.
    ///
    /// Returns a slice filled with `T::default()`. Grows the backing block
    /// when needed; returns `None` only if the system is out of memory.
    pub fn alloc(&mut self, len: usize) -> Option<&mut [T]> {
        let start = self.cursor.checked_next_multiple_of(Self::LANE)?;
        let end = start.checked_add(len)?;
        if end > self.capacity {
            self.grow(end)?;
        }
        self.cursor = end;
        let slice = self.slice_mut(start, len);
        slice.fill(T::default());
        Some(slice)
    }

    /// Forget every allocation. Does not release or clear the block.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Elements consumed so far, including alignment gaps.
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Total capacity of the backing block in elements.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Memory usage of the backing block in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.capacity * std::mem::size_of::<T>()
    }

    #[allow(unsafe_code)]
    fn grow(&mut self, required: usize) -> Option<()> {
        let new_cap = self
            .capacity
            .max(MIN_GROWTH)
            .max(required)
            .checked_mul(2)
            .unwrap_or(required);
        let block = Self::fresh_block(&self.alloc, new_cap)?;
        // SAFETY: both blocks are valid for at least `self.cursor` elements
        // and belong to different allocations; the old block is released
        // with the count it was allocated with.
        unsafe {
            std::ptr::copy_nonoverlapping(self.block.as_ptr(), block.as_ptr(), self.cursor);
            self.alloc.deallocate(self.block, self.capacity);
        }
        self.block = block;
        self.capacity = new_cap;
        Some(())
    }

    /// Allocate `capacity` elements and initialise all of them.
    #[allow(unsafe_code)]
    fn fresh_block(alloc: &AlignedAllocator<T, S, P>, capacity: usize) -> Option<NonNull<T>> {
        let block = alloc
            .allocate(capacity)
            .inspect_err(|err| log::debug!("scratch growth to {capacity} elements failed: {err}"))
            .ok()?;
        for i in 0..capacity {
            // SAFETY: `i < capacity` and the block holds `capacity` elements.
            unsafe { alloc.construct(block.add(i), T::default()) };
        }
        Some(block)
    }

    #[allow(unsafe_code)]
    fn slice_mut(&mut self, start: usize, len: usize) -> &mut [T] {
        debug_assert!(start + len <= self.capacity);
        // SAFETY: the range is within the block, every element is
        // initialised, and `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.block.as_ptr().add(start), len) }
    }
}

impl<T: Copy + Default, S: SimdWidth, P: AllocPrimitive> Drop for AlignedScratch<T, S, P> {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        // SAFETY: `block` was allocated with `capacity` elements and `T: Copy`
        // needs no drop.
        unsafe { self.alloc.deallocate(self.block, self.capacity) };
    }
}

#[allow(unsafe_code)]
// SAFETY: the region exclusively owns its block; the allocator is stateless.
unsafe impl<T: Copy + Default + Send, S: SimdWidth, P: AllocPrimitive> Send
    for AlignedScratch<T, S, P>
{
}

const fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

const fn lane_elements(size: usize, align: usize) -> usize {
    if size == 0 {
        1
    } else {
        align / gcd(size, align)
    }
}

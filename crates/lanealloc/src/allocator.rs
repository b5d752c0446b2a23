//! The typed aligned allocator and its container integration.
//!
//! [`AlignedAllocator`] hands out storage for `count` elements of `T`
//! aligned to `max(align_of::<T>(), S::ALIGNMENT)`, using only a primitive
//! `P` that guarantees its own natural alignment. It is zero-sized: the
//! configuration lives entirely in the type parameters.
//!
//! For generic containers it implements [`allocator_api2::alloc::Allocator`],
//! so `allocator_api2::vec::Vec<T, AlignedAllocator<T>>` gets SIMD-aligned
//! storage on stable Rust.

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use allocator_api2::alloc::Allocator;
use lanealloc_core::{AlignmentConfig, AllocError, NativeSimd, SimdWidth};

use crate::primitive::{AllocPrimitive, Global};
use crate::raw;

/// Stateless allocator for SIMD-aligned arrays of `T`.
///
/// - `S` picks the SIMD width (defaults to the build's [`NativeSimd`]).
/// - `P` picks the underlying primitive (defaults to [`Global`]).
///
/// Unsupported configurations (see [`AlignmentConfig::validate`]) are
/// rejected at compile time the first time [`allocate`](Self::allocate) is
/// instantiated; see [`ASSERT_SUPPORTED`](Self::ASSERT_SUPPORTED).
///
/// The inherent [`allocate`](Self::allocate) / [`deallocate`](Self::deallocate)
/// work in element counts. The [`Allocator`] impl works in [`Layout`]s and
/// is what containers call; use `Allocator::allocate(&a, layout)` to reach it
/// explicitly.
pub struct AlignedAllocator<T, S = NativeSimd, P = Global> {
    _marker: PhantomData<fn() -> (T, S, P)>,
}

impl<T, S: SimdWidth, P: AllocPrimitive> AlignedAllocator<T, S, P> {
    /// Resolved alignment parameters for `T`.
    pub const CONFIG: AlignmentConfig = AlignmentConfig::for_type::<T, S>(P::NATURAL_ALIGNMENT);

    /// Alignment of every pointer [`allocate`](Self::allocate) returns.
    pub const REQUIRED_ALIGNMENT: usize = Self::CONFIG.required;

    /// Padding added to every request (0 when no adjustment is needed).
    pub const EXTRA_BYTES: usize = Self::CONFIG.extra_bytes;

    /// Compile-time guard evaluated by [`allocate`](Self::allocate).
    ///
    /// Evaluating it for an unsupported configuration fails the build:
    ///
    /// ```compile_fail,E0080
    /// use std::ptr::NonNull;
    ///
    /// use lanealloc::{AlignedAllocator, AllocError, AllocPrimitive, Avx};
    ///
    /// /// Too narrow to hold a back-pointer.
    /// struct Narrow2;
    ///
    /// unsafe impl AllocPrimitive for Narrow2 {
    ///     const NATURAL_ALIGNMENT: usize = 2;
    ///
    ///     fn allocate(size: usize) -> Result<NonNull<u8>, AllocError> {
    ///         Err(AllocError::OutOfMemory { requested: size, align: 2 })
    ///     }
    ///
    ///     unsafe fn deallocate(_ptr: NonNull<u8>, _size: usize) {}
    /// }
    ///
    /// const _: () = AlignedAllocator::<u8, Avx, Narrow2>::ASSERT_SUPPORTED;
    /// ```
    pub const ASSERT_SUPPORTED: () = match Self::CONFIG.validate() {
        Ok(()) => (),
        Err(_) => panic!(
            "unsupported alignment: alignments must be powers of two, the \
             natural alignment must divide the required alignment, and a \
             padded configuration needs a natural alignment of at least \
             pointer size"
        ),
    };

    /// Create an allocator. Free: the allocator has no state.
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Largest element count whose byte size is representable.
    ///
    /// Zero-sized `T` has no limit.
    pub const fn max_size(&self) -> usize {
        let size = std::mem::size_of::<T>();
        if size == 0 {
            usize::MAX
        } else {
            isize::MAX as usize / size
        }
    }

    /// Allocate uninitialised storage for `count` elements.
    ///
    /// The returned pointer is aligned to [`REQUIRED_ALIGNMENT`](Self::REQUIRED_ALIGNMENT)
    /// and valid for `count` elements until passed to
    /// [`deallocate`](Self::deallocate). `count == 0` still yields a
    /// distinct pointer that must be released.
    ///
    /// # Errors
    ///
    /// [`AllocError::CapacityOverflow`] if `count > max_size()` (the
    /// primitive is not called), or [`AllocError::OutOfMemory`] if the
    /// primitive cannot satisfy the padded request.
    pub fn allocate(&self, count: usize) -> Result<NonNull<T>, AllocError> {
        let () = Self::ASSERT_SUPPORTED;

        let max_size = self.max_size();
        if count > max_size {
            log::debug!(
                "rejecting allocation of {count} x {}: max_size is {max_size}",
                std::any::type_name::<T>()
            );
            return Err(AllocError::CapacityOverflow { count, max_size });
        }
        let bytes = count * std::mem::size_of::<T>();
        raw::allocate_aligned::<P>(bytes, &Self::CONFIG).map(NonNull::cast)
    }

    /// Allocate storage for `count` elements with every byte set to zero.
    ///
    /// # Errors
    ///
    /// Same as [`allocate`](Self::allocate).
    #[allow(unsafe_code)]
    pub fn allocate_zeroed(&self, count: usize) -> Result<NonNull<T>, AllocError> {
        let ptr = self.allocate(count)?;
        // SAFETY: `allocate` returned a block valid for `count` elements.
        unsafe { ptr.as_ptr().write_bytes(0, count) };
        Ok(ptr)
    }

    /// Release storage obtained from [`allocate`](Self::allocate).
    ///
    /// Padded blocks are released through the stored back-pointer, never
    /// through `ptr` itself. Misuse is not detected.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate(count)` on an allocator with the same
    /// `T`, `S` and `P`, with the same `count`, and must not have been
    /// released already. Elements are not dropped.
    #[allow(unsafe_code)]
    pub unsafe fn deallocate(&self, ptr: NonNull<T>, count: usize) {
        let bytes = count * std::mem::size_of::<T>();
        // SAFETY: forwarded caller contract; `bytes` and `CONFIG` match the
        // values used at allocation.
        unsafe { raw::deallocate_aligned::<P>(ptr.cast(), bytes, &Self::CONFIG) }
    }

    /// The same allocator retargeted at element type `U`.
    pub const fn rebind<U>(&self) -> AlignedAllocator<U, S, P> {
        AlignedAllocator::new()
    }

    /// Address of `value` as a non-null pointer.
    pub fn address(&self, value: &T) -> NonNull<T> {
        NonNull::from(value)
    }

    /// Move `value` into uninitialised storage at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writes and aligned for `U`. Any previous
    /// value at `ptr` is overwritten without being dropped.
    #[allow(unsafe_code)]
    pub unsafe fn construct<U>(&self, ptr: NonNull<U>, value: U) {
        // SAFETY: forwarded caller contract.
        unsafe { ptr.as_ptr().write(value) }
    }

    /// Build a value with `init` and move it into storage at `ptr`.
    ///
    /// # Safety
    ///
    /// Same as [`construct`](Self::construct).
    #[allow(unsafe_code)]
    pub unsafe fn construct_with<U, F>(&self, ptr: NonNull<U>, init: F)
    where
        F: FnOnce() -> U,
    {
        // SAFETY: forwarded caller contract.
        unsafe { self.construct(ptr, init()) }
    }

    /// Run the destructor of the value at `ptr` without releasing storage.
    ///
    /// # Safety
    ///
    /// `ptr` must point to an initialised `U` that is not used again
    /// until re-constructed.
    #[allow(unsafe_code)]
    pub unsafe fn destroy<U>(&self, ptr: NonNull<U>) {
        // SAFETY: forwarded caller contract.
        unsafe { std::ptr::drop_in_place(ptr.as_ptr()) }
    }

    /// Config for an arbitrary layout: the layout's own alignment takes
    /// the place of `align_of::<T>()`.
    fn layout_config(layout: Layout) -> Result<AlignmentConfig, allocator_api2::alloc::AllocError> {
        let cfg = AlignmentConfig::resolve(layout.align(), S::ALIGNMENT, P::NATURAL_ALIGNMENT);
        cfg.validate().map_err(|err| {
            log::debug!("layout {layout:?} cannot be served: {err}");
            allocator_api2::alloc::AllocError
        })?;
        Ok(cfg)
    }
}

#[allow(unsafe_code)]
// SAFETY: blocks come from `raw::allocate_aligned`, which returns memory
// aligned to at least `layout.align()` and valid for `layout.size()` bytes.
// Deallocation recomputes the identical config from the same layout. All
// instances are interchangeable because the allocator has no state.
unsafe impl<T, S: SimdWidth, P: AllocPrimitive> Allocator for AlignedAllocator<T, S, P> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, allocator_api2::alloc::AllocError> {
        let cfg = Self::layout_config(layout)?;
        if layout.size() == 0 {
            let dangling = NonNull::new(std::ptr::without_provenance_mut::<u8>(cfg.required))
                .ok_or(allocator_api2::alloc::AllocError)?;
            return Ok(NonNull::slice_from_raw_parts(dangling, 0));
        }
        let ptr = raw::allocate_aligned::<P>(layout.size(), &cfg)
            .map_err(|_| allocator_api2::alloc::AllocError)?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        // A layout that passed `allocate` always resolves again.
        let Ok(cfg) = Self::layout_config(layout) else {
            return;
        };
        // SAFETY: the caller guarantees `ptr` was allocated with `layout`
        // by an equal allocator, so size and config match.
        unsafe { raw::deallocate_aligned::<P>(ptr, layout.size(), &cfg) }
    }
}

impl<T, S, P> Clone for AlignedAllocator<T, S, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, S, P> Copy for AlignedAllocator<T, S, P> {}

impl<T, S, P> Default for AlignedAllocator<T, S, P> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T, U, S, P> PartialEq<AlignedAllocator<U, S, P>> for AlignedAllocator<T, S, P> {
    fn eq(&self, _other: &AlignedAllocator<U, S, P>) -> bool {
        true
    }
}

impl<T, S, P> Eq for AlignedAllocator<T, S, P> {}

impl<T, U, S, P> From<&AlignedAllocator<U, S, P>> for AlignedAllocator<T, S, P> {
    fn from(_: &AlignedAllocator<U, S, P>) -> Self {
        Self::default()
    }
}

impl<T, S: SimdWidth, P: AllocPrimitive> fmt::Debug for AlignedAllocator<T, S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedAllocator")
            .field("element", &std::any::type_name::<T>())
            .field("simd", &S::NAME)
            .field("required_alignment", &Self::REQUIRED_ALIGNMENT)
            .field("extra_bytes", &Self::EXTRA_BYTES)
            .finish()
    }
}

//! Address arithmetic and back-pointer storage.
//!
//! Every raw pointer manipulation in the crate lives here. Padded
//! allocations look like this:
//!
//! ```text
//! raw                      adjusted (aligned to `required`)
//! │                        │
//! ▼                        ▼
//! ┌──────────────┬─────────┬──────────────────────────┬──────┐
//! │ slack        │ raw ptr │ payload (bytes)          │ tail │
//! └──────────────┴─────────┴──────────────────────────┴──────┘
//! ◄──────── offset ────────►
//! ◄──────────────────── bytes + extra_bytes ──────────────────►
//! ```
//!
//! `offset` is in `[POINTER_SIZE, extra_bytes]` and depends on where the
//! primitive placed the block, so the raw pointer cannot be recomputed from
//! the adjusted one. It is stored in the pointer-sized slot just below.

#![allow(unsafe_code)]

use std::ptr::NonNull;

use lanealloc_core::{AlignmentConfig, AllocError, POINTER_SIZE};

use crate::primitive::AllocPrimitive;

/// Round `addr` down to a multiple of `align` (a power of two).
#[inline]
pub(crate) const fn align_down(addr: usize, align: usize) -> usize {
    addr & !(align - 1)
}

/// Smallest multiple of `align` strictly greater than `addr`.
///
/// The classic stack-blob trick: reserve `align` spare bytes and this
/// always lands inside them.
#[inline]
pub(crate) const fn bump_align(addr: usize, align: usize) -> usize {
    align_down(addr.wrapping_add(align), align)
}

/// Bytes requested from the primitive for a `bytes`-sized payload.
///
/// Padded blocks get at least one payload byte so a zero-length allocation
/// still returns an address strictly inside its own block.
#[inline]
fn request_size(bytes: usize, cfg: &AlignmentConfig) -> Option<usize> {
    if cfg.is_padded() {
        cfg.padded_size(bytes.max(1))
    } else {
        Some(bytes)
    }
}

/// Store `base` in the pointer-sized slot just below `adjusted`.
///
/// # Safety
///
/// `[adjusted - POINTER_SIZE, adjusted)` must be writable memory of the
/// block `base` heads.
#[inline]
unsafe fn write_back_pointer(adjusted: NonNull<u8>, base: NonNull<u8>) {
    // SAFETY: the caller guarantees the slot is inside the block.
    unsafe {
        adjusted
            .as_ptr()
            .sub(POINTER_SIZE)
            .cast::<*mut u8>()
            .write_unaligned(base.as_ptr());
    }
}

/// Recover the base pointer stored by [`write_back_pointer`].
///
/// # Safety
///
/// `adjusted` must have been produced by [`allocate_aligned`] under a
/// padded config and not yet released.
#[inline]
unsafe fn read_back_pointer(adjusted: NonNull<u8>) -> NonNull<u8> {
    // SAFETY: the slot was initialised with a non-null base pointer when
    // the block was allocated.
    unsafe {
        let base = adjusted
            .as_ptr()
            .sub(POINTER_SIZE)
            .cast::<*mut u8>()
            .read_unaligned();
        NonNull::new_unchecked(base)
    }
}

/// Allocate `bytes` bytes aligned to `cfg.required` from primitive `P`.
///
/// `cfg` must have passed [`AlignmentConfig::validate`] and its natural
/// alignment must be `P::NATURAL_ALIGNMENT`.
pub(crate) fn allocate_aligned<P: AllocPrimitive>(
    bytes: usize,
    cfg: &AlignmentConfig,
) -> Result<NonNull<u8>, AllocError> {
    let Some(total) = request_size(bytes, cfg) else {
        log::debug!(
            "padded size overflows: {bytes} bytes + {} extra",
            cfg.extra_bytes
        );
        return Err(AllocError::OutOfMemory {
            requested: bytes,
            align: cfg.required,
        });
    };

    let base = P::allocate(total).map_err(|err| {
        log::debug!("primitive refused {total} bytes for align {}: {err}", cfg.required);
        AllocError::OutOfMemory {
            requested: total,
            align: cfg.required,
        }
    })?;

    if !cfg.is_padded() {
        debug_assert_eq!(base.as_ptr() as usize % cfg.required, 0);
        return Ok(base);
    }

    // extra_bytes == required for padded configs.
    let addr = base.as_ptr() as usize;
    let offset = bump_align(addr, cfg.required) - addr;
    debug_assert!(offset >= POINTER_SIZE && offset <= cfg.extra_bytes);

    // SAFETY: offset <= extra_bytes < total, so `adjusted` stays inside
    // the block and is non-null.
    let adjusted = unsafe { base.add(offset) };
    // SAFETY: offset >= POINTER_SIZE, so the slot below `adjusted` lies
    // within [base, adjusted).
    unsafe { write_back_pointer(adjusted, base) };
    Ok(adjusted)
}

/// Release a block obtained from [`allocate_aligned`].
///
/// # Safety
///
/// `ptr` must come from `allocate_aligned::<P>(bytes, cfg)` with the same
/// `bytes` and an equal `cfg`, and must not have been released already.
pub(crate) unsafe fn deallocate_aligned<P: AllocPrimitive>(
    ptr: NonNull<u8>,
    bytes: usize,
    cfg: &AlignmentConfig,
) {
    // Unreachable for pointers this module issued.
    let Some(total) = request_size(bytes, cfg) else {
        return;
    };

    if !cfg.is_padded() {
        // SAFETY: unpadded blocks are handed out unchanged.
        unsafe { P::deallocate(ptr, total) };
        return;
    }

    // SAFETY: padded blocks carry a back-pointer (caller contract).
    let base = unsafe { read_back_pointer(ptr) };
    // SAFETY: `base` is exactly what `P::allocate(total)` returned.
    unsafe { P::deallocate(base, total) };
}

//! Instrumented allocation primitives for lanealloc development.
//!
//! [`Recording`] logs every block it issues and every block it gets back,
//! so tests can check that an aligned allocation returns the exact base
//! address to the primitive exactly once. Its blocks are aligned to the
//! natural alignment `N` and deliberately never to `2 * N`, which forces
//! the aligned allocator to actually move the pointer.
//!
//! Ledgers are per thread: parallel tests do not see each other's blocks.

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::alloc::Layout;
use std::cell::RefCell;
use std::ptr::NonNull;

use indexmap::IndexMap;
use lanealloc::{AllocError, AllocPrimitive};

pub use fixtures::{Failing, Narrow2, Over64, Rgb24};

/// Everything a [`Recording`] primitive saw on the current thread.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    /// Blocks handed out, as `(address, size)`, in issue order.
    pub issued: Vec<(usize, usize)>,
    /// Blocks given back, as `(address, size)`, in release order.
    pub released: Vec<(usize, usize)>,
    /// Releases that did not match a live block (wrong address or size,
    /// or a double release). Such blocks are not freed.
    pub unmatched: Vec<(usize, usize)>,
    live: IndexMap<usize, usize>,
}

impl Ledger {
    /// Number of blocks issued and not yet released.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Size of the live block starting at `addr`, if any.
    pub fn live_size(&self, addr: usize) -> Option<usize> {
        self.live.get(&addr).copied()
    }

    /// The most recently issued block.
    pub fn last_issued(&self) -> Option<(usize, usize)> {
        self.issued.last().copied()
    }

    /// Every issued block came back exactly once with its own size.
    pub fn is_balanced(&self) -> bool {
        self.live.is_empty() && self.unmatched.is_empty() && self.released.len() == self.issued.len()
    }

    fn record_issue(&mut self, addr: usize, size: usize) {
        self.issued.push((addr, size));
        self.live.insert(addr, size);
    }

    /// Returns whether the release matched a live block.
    fn record_release(&mut self, addr: usize, size: usize) -> bool {
        self.released.push((addr, size));
        match self.live.get(&addr) {
            Some(&live_size) if live_size == size => {
                self.live.shift_remove(&addr);
                true
            }
            _ => {
                self.unmatched.push((addr, size));
                false
            }
        }
    }
}

thread_local! {
    static LEDGER: RefCell<Ledger> = RefCell::new(Ledger::default());
}

/// Primitive with natural alignment `N` that records every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct Recording<const N: usize>;

/// Recording primitive with 16-byte natural alignment.
pub type Recording16 = Recording<16>;

/// Recording primitive with 8-byte natural alignment.
pub type Recording8 = Recording<8>;

impl<const N: usize> Recording<N> {
    fn layout(size: usize) -> Layout {
        Layout::from_size_align(size + N, 2 * N).expect("test allocation layout")
    }

    /// Snapshot of this thread's ledger.
    pub fn ledger() -> Ledger {
        LEDGER.with(|l| l.borrow().clone())
    }

    /// Clear this thread's ledger. Live blocks are forgotten, not freed.
    pub fn reset() {
        LEDGER.with(|l| *l.borrow_mut() = Ledger::default());
    }
}

// SAFETY: blocks come from std::alloc with room for the N-byte shift, so
// they are N-aligned, valid for `size` bytes, and never overlap.
unsafe impl<const N: usize> AllocPrimitive for Recording<N> {
    const NATURAL_ALIGNMENT: usize = N;

    fn allocate(size: usize) -> Result<NonNull<u8>, AllocError> {
        let layout = Self::layout(size);
        // SAFETY: layout size is at least N > 0.
        let base = unsafe { std::alloc::alloc(layout) };
        let base = NonNull::new(base).ok_or(AllocError::OutOfMemory {
            requested: size,
            align: N,
        })?;
        // SAFETY: the block has N spare bytes at the front.
        let ptr = unsafe { base.add(N) };
        LEDGER.with(|l| l.borrow_mut().record_issue(ptr.as_ptr() as usize, size));
        Ok(ptr)
    }

    unsafe fn deallocate(ptr: NonNull<u8>, size: usize) {
        let matched = LEDGER.with(|l| l.borrow_mut().record_release(ptr.as_ptr() as usize, size));
        if matched {
            // SAFETY: `ptr` was issued by `allocate(size)` and is live.
            unsafe { std::alloc::dealloc(ptr.as_ptr().sub(N), Self::layout(size)) };
        }
    }
}

//! Integration test: generic containers on top of the aligned allocator.
//!
//! Drives `allocator_api2` containers through growth, shrinking and drop
//! and checks alignment throughout plus a balanced primitive ledger at
//! the end.

use allocator_api2::boxed::Box;
use allocator_api2::vec::Vec;
use lanealloc::registry::{simd_box, simd_vec, simd_vec_with_capacity, SimdAllocated, SimdVec};
use lanealloc::{AlignedAllocator, Avx, Avx512, NoSimd};
use lanealloc_test_utils::{Recording16, Recording8};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Pixel {
    r: f32,
    g: f32,
    b: f32,
    a: f32,
}

impl SimdAllocated for Pixel {
    type Alloc = AlignedAllocator<Pixel, Avx512, Recording16>;
}

#[test]
fn vec_growth_and_drop_balance_the_ledger() {
    Recording16::reset();
    {
        let mut v = Vec::new_in(AlignedAllocator::<f32, Avx, Recording16>::new());
        for i in 0..5_000 {
            v.push(i as f32);
            assert_eq!(v.as_ptr() as usize % 32, 0);
        }
        assert!(Recording16::ledger().issued.len() > 1);
        assert_eq!(Recording16::ledger().live_count(), 1);

        v.truncate(10);
        v.shrink_to_fit();
        assert_eq!(v.as_ptr() as usize % 32, 0);
        assert_eq!(v[9], 9.0);
    }
    assert!(Recording16::ledger().is_balanced());
}

#[test]
fn vec_of_over_aligned_layout_uses_layout_alignment() {
    #[derive(Clone, Copy)]
    #[repr(align(128))]
    struct Block([u8; 128]);

    Recording8::reset();
    {
        let mut v = Vec::new_in(AlignedAllocator::<u8, NoSimd, Recording8>::new());
        v.push(Block([7; 128]));
        v.push(Block([9; 128]));
        assert_eq!(v.as_ptr() as usize % 128, 0);
        assert_eq!(v[1].0[127], 9);
    }
    assert!(Recording8::ledger().is_balanced());
}

#[test]
fn rebound_allocator_serves_a_different_element_type() {
    Recording16::reset();
    let floats = AlignedAllocator::<f32, Avx, Recording16>::new();
    let bytes: AlignedAllocator<u8, Avx, Recording16> = floats.rebind();
    assert!(floats == bytes);
    {
        let mut v = Vec::new_in(bytes);
        v.extend_from_slice(b"lane");
        assert_eq!(v.as_ptr() as usize % 32, 0);
    }
    assert!(Recording16::ledger().is_balanced());
}

#[test]
fn vec_allocated_by_one_instance_is_freed_by_a_copy() {
    Recording16::reset();
    let alloc = AlignedAllocator::<u32, Avx, Recording16>::new();
    let mut v = Vec::with_capacity_in(64, alloc);
    v.extend(0..64u32);
    let (ptr, len, cap) = {
        let mut v = std::mem::ManuallyDrop::new(v);
        (v.as_mut_ptr(), v.len(), v.capacity())
    };
    let copy = alloc;
    // SAFETY: the parts come from a Vec built with an equal allocator.
    let v = unsafe { Vec::from_raw_parts_in(ptr, len, cap, copy) };
    assert_eq!(v[63], 63);
    drop(v);
    assert!(Recording16::ledger().is_balanced());
}

#[test]
fn boxed_value_is_aligned() {
    Recording16::reset();
    {
        let boxed = Box::new_in(3.5f64, AlignedAllocator::<f64, Avx512, Recording16>::new());
        assert_eq!(&*boxed as *const f64 as usize % 64, 0);
        assert_eq!(*boxed, 3.5);
    }
    assert!(Recording16::ledger().is_balanced());
}

#[test]
fn registered_type_picks_up_its_allocator() {
    Recording16::reset();
    {
        let mut pixels: SimdVec<Pixel> = simd_vec();
        pixels.push(Pixel::default());
        assert_eq!(pixels.as_ptr() as usize % 64, 0);

        let reserved: SimdVec<Pixel> = simd_vec_with_capacity(100);
        assert!(reserved.capacity() >= 100);
        assert_eq!(reserved.as_ptr() as usize % 64, 0);

        let one = simd_box(Pixel {
            r: 1.0,
            ..Pixel::default()
        });
        assert_eq!(&*one as *const Pixel as usize % 64, 0);
        assert_eq!(one.r, 1.0);
        assert_eq!(Recording16::ledger().live_count(), 3);
    }
    assert!(Recording16::ledger().is_balanced());
}

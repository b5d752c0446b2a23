//! Property tests over element types, SIMD widths and counts.

use lanealloc::{AlignedAllocator, Avx, Avx512, NoSimd, SimdWidth, Sse};
use lanealloc_test_utils::{Over64, Recording, Recording16, Recording8, Rgb24};
use proptest::prelude::*;

/// Allocate `count` elements, check alignment and padding, release, and
/// check the ledger.
fn round_trip<T, S: SimdWidth, const N: usize>(count: usize) -> Result<(), TestCaseError> {
    Recording::<N>::reset();
    let alloc = AlignedAllocator::<T, S, Recording<N>>::new();
    let required = AlignedAllocator::<T, S, Recording<N>>::REQUIRED_ALIGNMENT;
    let extra = AlignedAllocator::<T, S, Recording<N>>::EXTRA_BYTES;

    let ptr = alloc.allocate(count).unwrap();
    prop_assert_eq!(ptr.as_ptr() as usize % required, 0);

    let ledger = Recording::<N>::ledger();
    prop_assert_eq!(ledger.issued.len(), 1);
    let (base, size) = ledger.issued[0];
    let payload = count * std::mem::size_of::<T>();
    if extra == 0 {
        prop_assert_eq!(base, ptr.as_ptr() as usize);
        prop_assert_eq!(size, payload);
    } else {
        prop_assert_eq!(size, payload.max(1) + extra);
        prop_assert!(ptr.as_ptr() as usize > base);
        prop_assert!(ptr.as_ptr() as usize + payload <= base + size);
    }

    unsafe { alloc.deallocate(ptr, count) };
    let ledger = Recording::<N>::ledger();
    prop_assert_eq!(ledger.released.clone(), vec![(base, size)]);
    prop_assert!(ledger.is_balanced());
    Ok(())
}

proptest! {
    #[test]
    fn f32_every_width(count in 0usize..2048) {
        round_trip::<f32, NoSimd, 16>(count)?;
        round_trip::<f32, Sse, 16>(count)?;
        round_trip::<f32, Avx, 16>(count)?;
        round_trip::<f32, Avx512, 16>(count)?;
    }

    #[test]
    fn narrow_natural_alignment(count in 0usize..2048) {
        round_trip::<u8, Sse, 8>(count)?;
        round_trip::<u64, Avx, 8>(count)?;
        round_trip::<Rgb24, Avx512, 8>(count)?;
    }

    #[test]
    fn over_aligned_elements(count in 0usize..64) {
        round_trip::<Over64, NoSimd, 16>(count)?;
        round_trip::<Over64, Avx, 8>(count)?;
    }
}

#[test]
fn instances_always_compare_equal() {
    let a = AlignedAllocator::<f32, Avx, Recording16>::new();
    let b = a;
    let rebound = a.rebind::<Rgb24>();
    let back = AlignedAllocator::<f32, Avx, Recording16>::from(&rebound);
    assert!(a == b);
    assert!(a == rebound);
    assert!(back == a);
    assert!(
        AlignedAllocator::<u8, Sse, Recording8>::new()
            == AlignedAllocator::<u8, Sse, Recording8>::default()
    );
}

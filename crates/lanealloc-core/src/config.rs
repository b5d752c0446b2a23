//! Compile-time alignment configuration.
//!
//! Nothing here is mutable at run time. The SIMD width is a type parameter
//! ([`SimdWidth`]) resolved when the allocator type is named, and the
//! natural alignment is a constant of the allocation primitive. The two are
//! folded into an [`AlignmentConfig`] once per element type.

use std::fmt::Debug;

use crate::error::ConfigError;

/// Size of a machine pointer in bytes; the width of a stored back-pointer.
pub const POINTER_SIZE: usize = std::mem::size_of::<*mut u8>();

/// Alignment guaranteed by the global allocation primitive.
///
/// The alignment of the largest primitive scalar type, or the pointer size
/// if that is larger.
pub const NATURAL_ALIGNMENT: usize = max_usize(
    max_usize(std::mem::align_of::<u128>(), std::mem::align_of::<f64>()),
    std::mem::align_of::<usize>(),
);

const fn max_usize(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// Alignment width of a SIMD instruction set.
///
/// Implemented by zero-sized marker types so that the width participates
/// in the allocator's type, not its state.
pub trait SimdWidth: Copy + Default + Debug + Send + Sync + 'static {
    /// Alignment in bytes that vector loads and stores expect (1 if none).
    const ALIGNMENT: usize;
    /// Human-readable name, used in diagnostics.
    const NAME: &'static str;
}

macro_rules! simd_width {
    ($(#[$meta:meta])* $ty:ident, $align:expr, $name:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub struct $ty;

        impl SimdWidth for $ty {
            const ALIGNMENT: usize = $align;
            const NAME: &'static str = $name;
        }
    };
}

simd_width!(
    /// No vector unit: only the element's own alignment applies.
    NoSimd, 1, "none"
);
simd_width!(
    /// 128-bit SSE registers.
    Sse, 16, "sse"
);
simd_width!(
    /// 128-bit NEON registers.
    Neon, 16, "neon"
);
simd_width!(
    /// 256-bit AVX registers.
    Avx, 32, "avx"
);
simd_width!(
    /// 512-bit AVX-512 registers.
    Avx512, 64, "avx512"
);

/// The SIMD width chosen for this build.
///
/// The `simd-64`, `simd-32`, `simd-16` and `no-simd` cargo features force a
/// width (the widest enabled wins). Without them the width follows the
/// target features the crate is compiled with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NativeSimd;

impl SimdWidth for NativeSimd {
    const ALIGNMENT: usize = native_simd_alignment();
    const NAME: &'static str = native_simd_name();
}

const fn native_simd_alignment() -> usize {
    if cfg!(feature = "simd-64") {
        64
    } else if cfg!(feature = "simd-32") {
        32
    } else if cfg!(feature = "simd-16") {
        16
    } else if cfg!(feature = "no-simd") {
        1
    } else if cfg!(target_feature = "avx512f") {
        64
    } else if cfg!(target_feature = "avx") {
        32
    } else if cfg!(any(
        target_feature = "sse2",
        target_feature = "neon",
        target_feature = "simd128"
    )) {
        16
    } else {
        1
    }
}

const fn native_simd_name() -> &'static str {
    match native_simd_alignment() {
        64 => "native-512",
        32 => "native-256",
        16 => "native-128",
        _ => "native-none",
    }
}

/// Resolved alignment parameters for one element type.
///
/// Built with [`AlignmentConfig::resolve`]. All fields are derived; two
/// configs with equal fields produce interchangeable allocations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AlignmentConfig {
    /// Alignment guaranteed by the underlying primitive.
    pub natural: usize,
    /// Alignment demanded by the SIMD width.
    pub simd: usize,
    /// `max(element alignment, simd)`.
    pub required: usize,
    /// Padding added to every request: `required` when it exceeds
    /// `natural`, otherwise 0.
    pub extra_bytes: usize,
}

impl AlignmentConfig {
    /// Fold an element alignment, a SIMD alignment and the primitive's
    /// natural alignment into a config.
    pub const fn resolve(element_align: usize, simd: usize, natural: usize) -> Self {
        let required = max_usize(element_align, simd);
        let extra_bytes = if required > natural { required } else { 0 };
        Self {
            natural,
            simd,
            required,
            extra_bytes,
        }
    }

    /// Config for element type `T` under SIMD width `S`.
    pub const fn for_type<T, S: SimdWidth>(natural: usize) -> Self {
        Self::resolve(std::mem::align_of::<T>(), S::ALIGNMENT, natural)
    }

    /// Check the restrictions the pointer-adjustment technique relies on.
    ///
    /// Alignments must be powers of two. When padding is in use the
    /// natural alignment must divide the required alignment and be wide
    /// enough to hold a back-pointer, which guarantees at least
    /// [`POINTER_SIZE`] bytes between the raw and the adjusted address.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if !self.required.is_power_of_two() {
            return Err(ConfigError::RequiredNotPowerOfTwo {
                required: self.required,
            });
        }
        if !self.natural.is_power_of_two() {
            return Err(ConfigError::NaturalNotPowerOfTwo {
                natural: self.natural,
            });
        }
        if self.extra_bytes > 0 {
            if self.required % self.natural != 0 {
                return Err(ConfigError::NaturalDoesNotDivide {
                    natural: self.natural,
                    required: self.required,
                });
            }
            if self.natural < POINTER_SIZE {
                return Err(ConfigError::NoRoomForBackPointer {
                    natural: self.natural,
                });
            }
        }
        Ok(())
    }

    /// Whether allocations under this config carry a back-pointer.
    pub const fn is_padded(&self) -> bool {
        self.extra_bytes > 0
    }

    /// Bytes to request from the primitive for a `bytes`-sized payload.
    ///
    /// Returns `None` on overflow.
    pub const fn padded_size(&self, bytes: usize) -> Option<usize> {
        bytes.checked_add(self.extra_bytes)
    }
}

//! Allocation and configuration error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during allocation.
///
/// Both variants are the same out-of-memory condition; the variant only
/// records why the request could not be satisfied. Allocation never
/// retries and never hands out a null pointer instead of an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The underlying primitive could not satisfy the (padded) request.
    OutOfMemory {
        /// Number of bytes requested from the primitive, or the payload
        /// size if adding the padding overflowed.
        requested: usize,
        /// Alignment the caller needed.
        align: usize,
    },
    /// The element count cannot be represented as a byte size.
    ///
    /// Raised before the primitive is called; no partial allocation is
    /// attempted.
    CapacityOverflow {
        /// Number of elements requested.
        count: usize,
        /// Largest element count the allocator accepts.
        max_size: usize,
    },
}

impl AllocError {
    /// Always true: every allocation failure is an out-of-memory condition.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. } | Self::CapacityOverflow { .. })
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested, align } => {
                write!(
                    f,
                    "out of memory: failed to allocate {requested} bytes aligned to {align}"
                )
            }
            Self::CapacityOverflow { count, max_size } => {
                write!(
                    f,
                    "out of memory: {count} elements exceeds the maximum of {max_size}"
                )
            }
        }
    }
}

impl Error for AllocError {}

/// Alignment configurations the pointer-adjustment technique cannot serve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Required alignment is not a power of two.
    RequiredNotPowerOfTwo {
        /// The offending alignment.
        required: usize,
    },
    /// Natural alignment is not a power of two.
    NaturalNotPowerOfTwo {
        /// The offending alignment.
        natural: usize,
    },
    /// Natural alignment does not evenly divide the required alignment.
    NaturalDoesNotDivide {
        /// Natural alignment of the primitive.
        natural: usize,
        /// Required alignment.
        required: usize,
    },
    /// Natural alignment is narrower than a pointer, so the slack below an
    /// adjusted address may be too small for the back-pointer.
    NoRoomForBackPointer {
        /// Natural alignment of the primitive.
        natural: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequiredNotPowerOfTwo { required } => {
                write!(f, "required alignment {required} is not a power of two")
            }
            Self::NaturalNotPowerOfTwo { natural } => {
                write!(f, "natural alignment {natural} is not a power of two")
            }
            Self::NaturalDoesNotDivide { natural, required } => {
                write!(
                    f,
                    "natural alignment {natural} does not divide required alignment {required}"
                )
            }
            Self::NoRoomForBackPointer { natural } => {
                write!(
                    f,
                    "natural alignment {natural} is smaller than a pointer; no room for the back-pointer"
                )
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_variants_are_out_of_memory() {
        let oom = AllocError::OutOfMemory {
            requested: 72,
            align: 32,
        };
        let overflow = AllocError::CapacityOverflow {
            count: usize::MAX,
            max_size: 10,
        };
        assert!(oom.is_out_of_memory());
        assert!(overflow.is_out_of_memory());
    }

    #[test]
    fn display_mentions_sizes() {
        let err = AllocError::OutOfMemory {
            requested: 72,
            align: 32,
        };
        assert_eq!(
            err.to_string(),
            "out of memory: failed to allocate 72 bytes aligned to 32"
        );
        let err = ConfigError::RequiredNotPowerOfTwo { required: 24 };
        assert!(err.to_string().contains("24"));
    }
}

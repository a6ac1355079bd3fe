use thiserror::Error;

/// Errors that can occur when operating on an [`OpaqueVec`][crate::OpaqueVec] or
/// [`TypedVec`][crate::TypedVec].
///
/// Every operation validates its arguments before touching the vector, so an error other
/// than [`AllocationFailure`][Error::AllocationFailure] guarantees the vector is unchanged.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The caller provided an argument that can never be valid for the operation, such as
    /// a zero item size or a payload whose length does not match the item size.
    #[error("invalid argument: {problem}")]
    InvalidArgument {
        /// A human-readable description of the problem.
        problem: &'static str,
    },

    /// The requested index or range does not lie within the valid range of the vector.
    #[error("range of {length} item(s) at index {index} is out of range for vector of size {size}")]
    IndexOutOfRange {
        /// The first index of the requested range.
        index: usize,

        /// The number of items in the requested range.
        length: usize,

        /// The logical size of the vector when the request was made.
        size: usize,
    },

    /// The allocator could not provide a buffer of the required size. The vector is left
    /// in its previous valid state.
    #[error("failed to allocate a buffer of {bytes} bytes")]
    AllocationFailure {
        /// The number of bytes requested. Saturates at `usize::MAX` if the byte count
        /// itself could not be represented.
        bytes: usize,
    },

    /// A search completed without finding a matching item.
    #[error("no matching item was found")]
    NotFound,
}

/// A specialized `Result` type for vector operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use alloc::string::ToString;
    use core::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug, Clone);

    #[test]
    fn index_out_of_range_message_names_the_range() {
        let error = Error::IndexOutOfRange {
            index: 3,
            length: 2,
            size: 4,
        };

        assert_eq!(
            error.to_string(),
            "range of 2 item(s) at index 3 is out of range for vector of size 4"
        );
    }

    #[test]
    fn allocation_failure_message_names_bytes() {
        let error = Error::AllocationFailure { bytes: 64 };

        assert_eq!(error.to_string(), "failed to allocate a buffer of 64 bytes");
    }

    #[test]
    fn not_found_is_distinct_from_invalid_argument() {
        let invalid = Error::InvalidArgument {
            problem: "item size must be non-zero",
        };

        assert_ne!(invalid, Error::NotFound);
        assert!(invalid.to_string().contains("item size must be non-zero"));
    }
}

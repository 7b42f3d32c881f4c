//! Error types for persistent collection operations.
//!
//! Every fallible operation in this crate reports failure through
//! [`CollectionError`]. Failures never leave a partially updated structure
//! behind: the receiver and every value derived from it stay untouched.

use std::fmt;

/// Represents errors that can occur when querying or updating a persistent
/// collection.
///
/// # Examples
///
/// ```rust
/// use persistent_collections::CollectionError;
/// use persistent_collections::persistent::PersistentVector;
///
/// let vector: PersistentVector<i32> = (1..=3).collect();
/// assert_eq!(
///     vector.lookup(5),
///     Err(CollectionError::IndexOutOfRange { index: 5, length: 3 })
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// The index lies outside the valid range after negative-index
    /// normalization.
    ///
    /// Reads accept `[0, length)`; writes accept `[0, length]`, where
    /// `length` itself means "append".
    IndexOutOfRange {
        /// The index as supplied by the caller.
        index: isize,
        /// The length of the sequence at the time of the call.
        length: usize,
    },

    /// An argument cannot be used for the requested operation, such as a
    /// named key where a sequence index is required.
    InvalidArgument {
        /// Human-readable description of the offending argument.
        reason: String,
    },

    /// The key (or set element) is not present.
    KeyNotFound,

    /// The operation is not defined between the given values.
    ///
    /// This is the "not comparable" signal for comparisons between
    /// incompatible collection kinds. It is not a hard failure.
    Unsupported {
        /// The name of the operation that was attempted.
        operation: &'static str,
    },
}

impl CollectionError {
    /// Creates an [`CollectionError::InvalidArgument`] from any displayable reason.
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CollectionError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { index, length } => {
                write!(
                    formatter,
                    "index {index} out of range for sequence of length {length}"
                )
            }
            Self::InvalidArgument { reason } => {
                write!(formatter, "invalid argument: {reason}")
            }
            Self::KeyNotFound => write!(formatter, "key not found"),
            Self::Unsupported { operation } => {
                write!(formatter, "{operation} is not supported between these values")
            }
        }
    }
}

impl std::error::Error for CollectionError {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        CollectionError::IndexOutOfRange { index: -4, length: 3 },
        "index -4 out of range for sequence of length 3"
    )]
    #[case(
        CollectionError::invalid_argument("'name' cannot be interpreted as an index"),
        "invalid argument: 'name' cannot be interpreted as an index"
    )]
    #[case(CollectionError::KeyNotFound, "key not found")]
    #[case(
        CollectionError::Unsupported { operation: "ordering" },
        "ordering is not supported between these values"
    )]
    fn test_display(#[case] error: CollectionError, #[case] expected: &str) {
        assert_eq!(format!("{error}"), expected);
    }

    #[rstest]
    fn test_is_std_error() {
        fn assert_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
        assert_error(&CollectionError::KeyNotFound);
    }
}

//! Error types for sugerir operations.
//!
//! Provides rich error context for library consumers. Contract violations
//! (dimension/index/sequence) are raised before any model computation;
//! numeric failures carry the context in which a non-finite value appeared.

use std::fmt;

/// Main error type for sugerir operations.
///
/// # Examples
///
/// ```
/// use sugerir::error::SugerirError;
///
/// let err = SugerirError::DimensionMismatch {
///     expected: "meta_dim=10".to_string(),
///     actual: "9".to_string(),
/// };
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Debug)]
pub enum SugerirError {
    /// Feature/matrix dimensions don't match the configured width.
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// A user or item index falls outside the configured range.
    IndexOutOfRange {
        /// Index space name ("user", "item", "sequence token")
        space: String,
        /// Offending index
        index: usize,
        /// Exclusive upper bound of the space
        len: usize,
    },

    /// A history sequence has the wrong length.
    SequenceLength {
        /// Configured sequence length
        expected: usize,
        /// Length received
        actual: usize,
    },

    /// Invalid hyperparameter value provided.
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// A non-finite value (NaN/Inf) surfaced during computation.
    NumericFailure {
        /// Where the value appeared
        context: String,
    },

    /// An operation was requested before its antecedent step ran.
    PreconditionFailed {
        /// What must happen first
        message: String,
    },

    /// No job is registered under the given identifier.
    UnknownJob {
        /// The job identifier
        id: String,
    },

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for SugerirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SugerirError::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: expected {expected}, got {actual}")
            }
            SugerirError::IndexOutOfRange { space, index, len } => {
                write!(f, "{space} index {index} out of range (len={len})")
            }
            SugerirError::SequenceLength { expected, actual } => {
                write!(
                    f,
                    "history sequence length mismatch: expected {expected}, got {actual}"
                )
            }
            SugerirError::InvalidHyperparameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "invalid hyperparameter: {param} = {value}, expected {constraint}"
                )
            }
            SugerirError::NumericFailure { context } => {
                write!(f, "non-finite value encountered in {context}")
            }
            SugerirError::PreconditionFailed { message } => {
                write!(f, "precondition not met: {message}")
            }
            SugerirError::UnknownJob { id } => write!(f, "unknown job id: {id}"),
            SugerirError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SugerirError {}

impl From<&str> for SugerirError {
    fn from(msg: &str) -> Self {
        SugerirError::Other(msg.to_string())
    }
}

impl From<String> for SugerirError {
    fn from(msg: String) -> Self {
        SugerirError::Other(msg)
    }
}

impl SugerirError {
    /// Create a dimension mismatch error with descriptive context.
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create an index-out-of-range error for a named index space.
    #[must_use]
    pub fn index_out_of_range(space: &str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            space: space.to_string(),
            index,
            len,
        }
    }

    /// Create a numeric-failure error for a named computation site.
    #[must_use]
    pub fn numeric(context: &str) -> Self {
        Self::NumericFailure {
            context: context.to_string(),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, SugerirError>;

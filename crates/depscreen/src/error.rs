use std::error::Error;
use std::fmt;

/// Errors raised by the dependency estimators, dataset construction and
/// configuration validation.
#[derive(Debug, Clone, PartialEq)]
pub enum DependencyError {
    /// Fewer jointly valid rows than the estimator needs.
    InsufficientData { required: usize, found: usize },
    /// Every pairwise distance is zero, so no kernel scale can be derived.
    DegenerateDistance,
    /// Two samples that should be aligned have different lengths.
    DimensionMismatch { left: usize, right: usize },
    /// A sample has zero variance (constant column).
    ZeroVariance,
    /// Configuration values that make the computation meaningless.
    InvalidConfig(String),
    DuplicateColumn(String),
    DuplicateIndex(i64),
    /// A series length does not match the dataset index length.
    LengthMismatch { column: String, expected: usize, found: usize },
}

impl fmt::Display for DependencyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DependencyError::InsufficientData { required, found } => write!(
                f,
                "insufficient data: {} valid rows required, {} found",
                required, found
            ),
            DependencyError::DegenerateDistance => {
                write!(f, "all pairwise distances are zero (constant input)")
            }
            DependencyError::DimensionMismatch { left, right } => write!(
                f,
                "samples are not aligned: {} rows vs {} rows",
                left, right
            ),
            DependencyError::ZeroVariance => write!(f, "sample has zero variance"),
            DependencyError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            DependencyError::DuplicateColumn(name) => write!(f, "duplicate column name '{}'", name),
            DependencyError::DuplicateIndex(key) => write!(f, "duplicate index key {}", key),
            DependencyError::LengthMismatch {
                column,
                expected,
                found,
            } => write!(
                f,
                "column '{}' has {} values but the index has {}",
                column, found, expected
            ),
        }
    }
}

impl Error for DependencyError {}

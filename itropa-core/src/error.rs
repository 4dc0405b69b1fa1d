use thiserror::Error;

/// Errors from tree operations and need validation.
///
/// Every operation that fails leaves its input untouched, so callers that
/// prefer to treat a miss as a no-op can keep using the original forest.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Expression not found: {0}")]
    ExpressionNotFound(String),

    #[error("Duplicate expression id: {0}")]
    DuplicateId(String),

    #[error("Need has no future era")]
    NoFutureEra,

    #[error("Need has {0} future eras, expected exactly one")]
    AmbiguousFutureEra(usize),

    #[error("Era is read-only: {0}")]
    ReadOnlyEra(String),
}

pub type TreeResult<T> = std::result::Result<T, TreeError>;

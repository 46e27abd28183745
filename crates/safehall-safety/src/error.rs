//! Error types for the content-safety analyzer.

use thiserror::Error;

/// Errors raised while compiling a lexicon.
///
/// Analysis itself never fails; only construction can.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafetyError {
    /// A term was empty or whitespace only.
    #[error("lexicon term is empty")]
    EmptyTerm,

    /// A term could not be compiled into a matcher.
    #[error("invalid lexicon term '{term}': {reason}")]
    InvalidTerm { term: String, reason: String },
}

/// Result type for safety operations.
pub type Result<T> = std::result::Result<T, SafetyError>;

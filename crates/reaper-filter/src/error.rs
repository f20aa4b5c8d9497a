//! Filter error types.

use thiserror::Error;

pub type FilterResult<T> = Result<T, FilterError>;

/// Reasons a filter cannot be evaluated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("no predicate named `{0}`")]
    UnknownPredicate(String),

    #[error("`{predicate}` takes {expected} argument(s), got {found}")]
    Arity {
        predicate: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("`{predicate}` expects a boolean, got `{value}`")]
    InvalidBool { predicate: &'static str, value: String },

    #[error("`{predicate}` expects an RFC 3339 timestamp, got `{value}`: {reason}")]
    InvalidTimestamp {
        predicate: &'static str,
        value: String,
        reason: String,
    },
}

//! Error types for reaper-core.

use thiserror::Error;

/// Result type alias for instance construction.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building an [`Instance`](crate::Instance) from a provider record.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("instance record is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("instance record has an empty `{0}`")]
    EmptyField(&'static str),
}

/// Result type alias for lifecycle tag encoding and decoding.
pub type CodecResult<T> = Result<T, CodecError>;

/// Reasons a lifecycle tag could not be decoded (or a value could not be encoded).
///
/// [`decode`](crate::lifecycle::decode) never returns these; it logs them and
/// falls back to [`LifecycleState::Untracked`](crate::LifecycleState::Untracked).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("expected 2 or 3 `|`-separated fields, found {0}")]
    FieldCount(usize),

    #[error("stage token is empty")]
    EmptyStage,

    #[error("unparsable timestamp `{value}`: {reason}")]
    Timestamp { value: String, reason: String },

    #[error("`{0}` contains the reserved separator `|`")]
    ReservedSeparator(String),

    #[error("`{0}` would not decode back to the same value")]
    NotCanonical(String),
}

/// Result type alias for config loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or validating `reaper.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

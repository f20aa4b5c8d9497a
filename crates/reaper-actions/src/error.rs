//! Action error types.

use std::fmt;

use thiserror::Error;

use reaper_core::CodecError;

pub type ActionResult<T> = Result<T, ActionError>;

/// A single-instance provider action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Describe,
    Tag,
    Stop,
    Terminate,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Describe => "describe",
            Action::Tag => "tag",
            Action::Stop => "stop",
            Action::Terminate => "terminate",
        })
    }
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{action} failed for {target}: {source}")]
    Provider {
        action: Action,
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{action} of {instance} affected {count} instance(s), expected exactly 1")]
    UnexpectedCount {
        action: Action,
        instance: String,
        count: usize,
    },

    #[error("cannot encode lifecycle state: {0}")]
    Codec(#[from] CodecError),
}

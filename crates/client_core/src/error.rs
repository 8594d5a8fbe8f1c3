use std::time::Duration;

use shared::{
    domain::ItemId,
    error::{ApiError, ErrorCode},
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Load,
    Add,
    Complete,
    RemoveLocal,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Load => "load",
            Operation::Add => "add",
            Operation::Complete => "complete",
            Operation::RemoveLocal => "remove_local",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by, or on the way to, the remote logic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("backend rejected request ({code:?}): {message}")]
    Rejected { code: ErrorCode, message: String },
    #[error("interaction {ix_hash} failed: {reason}")]
    InteractionFailed {
        ix_hash: String,
        code: Option<ErrorCode>,
        reason: String,
    },
    #[error("interaction {ix_hash} not acknowledged within {waited:?}")]
    AckTimeout { ix_hash: String, waited: Duration },
    #[error("malformed backend response: {0}")]
    Decode(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl RemoteError {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            RemoteError::Rejected { code, .. } => Some(*code),
            RemoteError::InteractionFailed { code, .. } => *code,
            _ => None,
        }
    }
}

impl From<ApiError> for RemoteError {
    fn from(value: ApiError) -> Self {
        RemoteError::Rejected {
            code: value.code,
            message: value.message,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            RemoteError::Decode(value.to_string())
        } else {
            RemoteError::Transport(value.to_string())
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("todo {id} does not exist{}", len_suffix(.len))]
    NotFound { id: ItemId, len: Option<usize> },
    #[error("{op} failed: {source}")]
    Remote {
        op: Operation,
        #[source]
        source: RemoteError,
    },
    #[error("{0} already in flight")]
    Busy(Operation),
}

fn len_suffix(len: &Option<usize>) -> String {
    len.map(|len| format!(" (list has {len} entries)"))
        .unwrap_or_default()
}

impl SyncError {
    pub fn remote(op: Operation, source: RemoteError) -> Self {
        SyncError::Remote { op, source }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, SyncError::Busy(_))
    }

    /// Attributes a remote failure to the command that issued the call.
    pub fn reported_by(self, op: Operation) -> Self {
        match self {
            SyncError::Remote { source, .. } => SyncError::Remote { op, source },
            other => other,
        }
    }
}

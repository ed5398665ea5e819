// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The error model shared by every component.
//!
//! Every fallible operation in this workspace returns [`Error`]. The variants
//! correspond 1:1 to the tagged error kinds in the coordination core design:
//! some are never retried, some drive a task back to `Queued`, and `Fatal` is
//! only ever constructed during startup.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Tagged error kind shared across the workspace.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("queue full ({pending}/{capacity} pending)")]
    QueueFull { pending: usize, capacity: usize },

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("permanent failure: {0}")]
    Permanent(String),

    #[error("delegation hop limit reached ({hops}/{max_hops})")]
    HopLimit { hops: u32, max_hops: u32 },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("fatal startup error: {reason}")]
    Fatal { reason: String, exit_code: i32 },
}

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Error::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    pub fn fatal(reason: impl Into<String>, exit_code: i32) -> Self {
        Error::Fatal { reason: reason.into(), exit_code }
    }

    /// Whether a task that failed with this error kind should be retried
    /// (returned to `Queued` with `attempt` incremented) rather than moved
    /// straight to dead-letter.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Transient(_))
    }

    /// CLI exit-code classification (§4.10): 0 never comes from an `Error`
    /// (only `Ok` produces it), 1 = operational failure, 2 = usage error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidInput(_) | Error::Conflict(_) | Error::HopLimit { .. } => 2,
            Error::Fatal { exit_code, .. } => *exit_code,
            _ => 1,
        }
    }

    /// Short machine-readable tag, used in log fields and dead-letter reasons.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::QueueFull { .. } => "queue_full",
            Error::Timeout(_) => "timeout",
            Error::Transient(_) => "transient",
            Error::Permanent(_) => "permanent",
            Error::HopLimit { .. } => "hop_limit",
            Error::Storage(_) => "storage",
            Error::Fatal { .. } => "fatal",
        }
    }
}

/// Lightweight, serializable projection of an [`Error`] for storing on a
/// terminal task row (`error` field in §3's Task entity).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TaskError {
    pub kind: String,
    pub message: String,
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<&Error> for TaskError {
    fn from(err: &Error) -> Self {
        TaskError { kind: err.kind().to_string(), message: err.to_string() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::registry::TargetId;

/// Reason attached to a failed per-target outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No live session is currently registered for the target.
    TargetUnavailable,
    /// The input surface or send affordance could not be located in time.
    SubmissionFailed,
    /// The completion detector hit its deadline.
    TimeoutError,
    /// The target has no platform adapter at all.
    UnknownTarget,
    /// The request never reached the session's worker, or no answer came back.
    DeliveryFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::TargetUnavailable => "TargetUnavailable",
            ErrorKind::SubmissionFailed => "SubmissionFailed",
            ErrorKind::TimeoutError => "TimeoutError",
            ErrorKind::UnknownTarget => "UnknownTarget",
            ErrorKind::DeliveryFailed => "DeliveryFailed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("submission to {target} failed: {reason}")]
    SubmissionFailed { target: TargetId, reason: String },

    #[error(
        "timeout waiting for a complete response from {target} after {}ms",
        .elapsed.as_millis()
    )]
    Timeout { target: TargetId, elapsed: Duration },

    #[error("no platform adapter for host '{0}'")]
    UnsupportedPlatform(String),
}

impl WorkerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::SubmissionFailed { .. } => ErrorKind::SubmissionFailed,
            WorkerError::Timeout { .. } => ErrorKind::TimeoutError,
            WorkerError::UnsupportedPlatform(_) => ErrorKind::UnknownTarget,
        }
    }
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("element '{0}' not found")]
    NotFound(String),

    #[error("page is detached")]
    Detached,

    #[error("page script failed: {0}")]
    Script(String),
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("session {0} has no attached worker")]
    SessionNotAttached(String),

    #[error("channel to session {0} closed before a response arrived")]
    ChannelClosed(String),

    #[error("no response from session {session} within {}ms", .elapsed.as_millis())]
    Timeout { session: String, elapsed: Duration },

    #[error("no pending request with id {0}")]
    UnknownRequest(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to (de)serialize workflow result: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("result store lock poisoned")]
    Poisoned,

    #[error("failed to prepare store location: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

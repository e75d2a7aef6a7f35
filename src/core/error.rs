//! Error types for queue and process thread operations.

use thiserror::Error;

use super::task::Token;

/// Contract violations reported by [`AdmissionQueue`](super::AdmissionQueue).
///
/// None of these are runtime conditions a well-behaved caller should see:
/// they signal that the caller's own bookkeeping disagrees with the queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// Token is already pending, running, completed or aborted.
    #[error("token {0} is already queued")]
    DuplicateToken(Token),
    /// Token is not running, so it cannot be completed.
    #[error("token {0} is not running")]
    NotRunning(Token),
    /// Token is neither completed nor aborted, so it cannot be removed.
    #[error("token {0} is neither completed nor aborted")]
    NotRemovable(Token),
    /// Token is completed, already aborted, or unknown.
    #[error("token {0} cannot be aborted")]
    NotAbortable(Token),
    /// Token is not held by the queue at all.
    #[error("unknown token {0}")]
    UnknownToken(Token),
    /// Queue configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors produced by [`ProcessThread`](super::ProcessThread).
#[derive(Debug, Error)]
pub enum ProcessThreadError {
    /// `start` was called while the thread is running.
    #[error("process thread is already running")]
    AlreadyRunning,
    /// The same module instance was registered twice.
    #[error("module is already registered")]
    ModuleAlreadyRegistered,
    /// The OS refused to spawn the thread.
    #[error("failed to spawn process thread: {0}")]
    Spawn(#[from] std::io::Error),
    /// Thread configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

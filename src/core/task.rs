//! Task record and token types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::cancel::{AbortCallback, StartCallback};

/// Opaque identifier of a task within one admission queue.
///
/// Queue-assigned tokens start at 1 and increase monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(u64);

impl Token {
    /// Wrap a caller-chosen raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for Token {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Lifecycle state of a task as seen by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting for a free slot.
    Pending,
    /// Admitted; start callback has been (or is being) invoked.
    Running,
    /// Finished normally, still holding its slot until removed.
    Completed,
    /// Cancelled before or during execution.
    Aborted,
}

/// A task waiting in the pending sequence. Owns the start callback until admission.
pub(crate) struct PendingTask {
    pub token: Token,
    pub start: StartCallback,
}

/// A task that has left pending.
///
/// `abort` is filled in once the start callback has returned and the record
/// is confirmed to still be running. Tasks aborted while pending never get one.
pub(crate) struct Task {
    pub token: Token,
    pub abort: Option<AbortCallback>,
}

impl Task {
    pub const fn new(token: Token) -> Self {
        Self { token, abort: None }
    }
}

impl fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTask").field("token", &self.token).finish()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("token", &self.token)
            .field("has_abort", &self.abort.is_some())
            .finish()
    }
}

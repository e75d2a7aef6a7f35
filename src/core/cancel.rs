//! Cancellation protocol between the queue and in-flight work.
//!
//! A task's start callback kicks off work and hands back an [`AbortCallback`].
//! The queue invokes that callback at most once, and only from
//! [`AdmissionQueue::abort`](super::AdmissionQueue::abort). In the other
//! direction, work reports that it finished through a [`Completer`], which
//! refuses to complete a task that was aborted in the meantime.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::error::QueueError;
use super::queue::QueueShared;
use super::task::Token;
use super::task_runner::TaskRunner;

/// Zero-argument callback that starts asynchronous work and returns the means to cancel it.
pub type StartCallback = Box<dyn FnOnce() -> AbortCallback + Send + 'static>;

/// One-shot cancellation callback.
pub struct AbortCallback {
    inner: Box<dyn FnOnce() + Send + 'static>,
}

impl AbortCallback {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self { inner: Box::new(f) }
    }

    /// A callback that does nothing, for work that cannot be interrupted.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Consume and invoke the callback.
    pub fn run(self) {
        (self.inner)();
    }
}

impl fmt::Debug for AbortCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AbortCallback")
    }
}

/// Shared flag that long-running work can poll to notice cancellation.
///
/// ```
/// use prometheus_admission::core::AbortSignal;
///
/// let signal = AbortSignal::new();
/// let abort = signal.abort_callback();
/// assert!(!signal.is_aborted());
/// abort.run();
/// assert!(signal.is_aborted());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    aborted: Arc<AtomicBool>,
}

impl AbortSignal {
    /// Create an un-raised signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    /// Whether the signal has been raised.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Build an abort callback that raises this signal.
    #[must_use]
    pub fn abort_callback(&self) -> AbortCallback {
        let signal = self.clone();
        AbortCallback::new(move || signal.abort())
    }
}

/// Handle used by in-flight work to report that it finished.
///
/// Holds only a weak reference, so it may be captured by an abort callback
/// without keeping the queue alive.
pub struct Completer<R: TaskRunner> {
    token: Token,
    queue: Weak<QueueShared<R>>,
}

impl<R: TaskRunner> Completer<R> {
    pub(crate) const fn new(token: Token, queue: Weak<QueueShared<R>>) -> Self {
        Self { token, queue }
    }

    /// Token this handle completes.
    #[must_use]
    pub const fn token(&self) -> Token {
        self.token
    }

    /// Move the task from running to completed.
    ///
    /// Returns `Ok(false)` when the task was aborted first or the queue has
    /// been dropped; in both cases there is nothing left to report to.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotRunning`] if the task is neither running nor aborted.
    pub fn complete(self) -> Result<bool, QueueError> {
        match self.queue.upgrade() {
            Some(shared) => shared.complete_unless_aborted(self.token),
            None => Ok(false),
        }
    }
}

impl<R: TaskRunner> fmt::Debug for Completer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer").field("token", &self.token).finish()
    }
}

//! Tokio runtime task runner.

use std::future::Future;
use std::sync::Arc;

use crate::core::{AbortCallback, PostedTask, TaskRunner};

/// Tokio-based runner that posts closures onto a tokio runtime.
#[derive(Clone)]
pub struct TokioTaskRunner {
    handle: Arc<tokio::runtime::Handle>,
}

impl TokioTaskRunner {
    /// Create a runner from a tokio runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Create a runner on the runtime the caller is executing in.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like [`tokio::runtime::Handle::current`].
    #[must_use]
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }

    /// Spawn `fut` and return an abort callback that cancels the spawned task.
    ///
    /// Intended for use inside a start callback:
    ///
    /// ```rust,ignore
    /// let runner = TokioTaskRunner::current();
    /// let queue = AdmissionQueue::new(QueueConfig::default(), runner.clone())?;
    /// let token = queue.new_token();
    /// let completer = queue.completer(token);
    /// queue.enqueue(token, move || {
    ///     runner.start_abortable(async move {
    ///         fetch_chunk().await;
    ///         let _ = completer.complete();
    ///     })
    /// })?;
    /// ```
    pub fn start_abortable<F>(&self, fut: F) -> AbortCallback
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let join = self.handle.spawn(fut);
        AbortCallback::new(move || join.abort())
    }
}

impl TaskRunner for TokioTaskRunner {
    fn post(&self, task: PostedTask) {
        self.handle.spawn(async move { task() });
    }
}

impl std::fmt::Debug for TokioTaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioTaskRunner").finish_non_exhaustive()
    }
}

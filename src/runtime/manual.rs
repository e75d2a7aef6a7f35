//! Deterministic task runner driven by the caller.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{PostedTask, TaskRunner};

/// Queues posted closures until the caller drains them.
///
/// Clones share the same backlog, so a test can hand one clone to an
/// [`AdmissionQueue`](crate::core::AdmissionQueue) and keep another to pump it.
#[derive(Clone, Default)]
pub struct ManualTaskRunner {
    tasks: Arc<Mutex<VecDeque<PostedTask>>>,
}

impl ManualTaskRunner {
    /// Create an empty runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of closures waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Run the oldest posted closure. Returns `false` if there was none.
    pub fn run_next(&self) -> bool {
        // Lock released before running: the closure may post more work.
        let task = self.tasks.lock().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run closures, including ones posted while draining, until none remain.
    /// Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl TaskRunner for ManualTaskRunner {
    fn post(&self, task: PostedTask) {
        self.tasks.lock().push_back(task);
    }
}

impl std::fmt::Debug for ManualTaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualTaskRunner")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_post_does_not_run_inline() {
        let runner = ManualTaskRunner::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        runner.post(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(runner.run_until_idle(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drains_work_posted_while_running() {
        let runner = ManualTaskRunner::new();
        let inner = runner.clone();
        runner.post(Box::new(move || {
            inner.post(Box::new(|| {}));
        }));
        assert_eq!(runner.run_until_idle(), 2);
        assert!(!runner.run_next());
    }
}

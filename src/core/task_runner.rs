//! Abstraction for posting work onto an execution context.

use std::sync::Arc;

/// A closure posted to a [`TaskRunner`].
pub type PostedTask = Box<dyn FnOnce() + Send + 'static>;

/// Schedules closures to run later on some execution context.
///
/// The queue only requires that `post` never runs the closure inline on the
/// caller's stack; ordering and threading are up to the implementation.
pub trait TaskRunner: Send + Sync + 'static {
    /// Schedule `task` to run asynchronously.
    fn post(&self, task: PostedTask);
}

impl<T: TaskRunner + ?Sized> TaskRunner for Arc<T> {
    fn post(&self, task: PostedTask) {
        (**self).post(task);
    }
}

//! Bounded admission queue with abort semantics.
//!
//! Tasks move through four disjoint collections: pending (FIFO), running,
//! completed and aborted. The ceiling bounds `running + completed`, so a task
//! that finished but has not been removed still holds its slot.
//!
//! Re-evaluation is never run inline: every state change that may free a slot
//! posts a `maybe_run` onto the [`TaskRunner`]. Start and abort callbacks run
//! with the state lock released, so they may call back into the queue.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{AdmissionMode, QueueConfig};

use super::audit::{AuditSink, QueueAction, QueueEvent};
use super::cancel::{AbortCallback, Completer, StartCallback};
use super::error::QueueError;
use super::task::{PendingTask, Task, TaskState, Token};
use super::task_runner::TaskRunner;

/// Snapshot of queue occupancy and lifetime counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Configured ceiling on running + completed tasks.
    pub max_in_parallel: usize,
    /// Tasks waiting for a slot.
    pub pending: usize,
    /// Tasks admitted and not yet completed or aborted.
    pub running: usize,
    /// Tasks completed but not yet removed.
    pub completed: usize,
    /// Tasks aborted but not yet removed.
    pub aborted: usize,
    /// Total tasks enqueued.
    pub enqueued_total: u64,
    /// Total tasks admitted.
    pub started_total: u64,
    /// Total tasks completed.
    pub completed_total: u64,
    /// Total tasks aborted.
    pub aborted_total: u64,
    /// Total tasks removed.
    pub removed_total: u64,
}

impl QueueStats {
    /// Slots currently held against the ceiling.
    #[must_use]
    pub const fn occupied(&self) -> usize {
        self.running + self.completed
    }
}

#[derive(Debug, Default)]
struct QueueCounters {
    enqueued: u64,
    started: u64,
    completed: u64,
    aborted: u64,
    removed: u64,
}

#[derive(Debug)]
struct QueueState {
    next_token: u64,
    pending: VecDeque<PendingTask>,
    running: HashMap<Token, Task>,
    completed: HashMap<Token, Task>,
    aborted: HashMap<Token, Task>,
    /// Aborted while their start callback was still executing.
    abort_on_start: HashSet<Token>,
    counters: QueueCounters,
}

impl QueueState {
    fn new() -> Self {
        Self {
            next_token: 1,
            pending: VecDeque::new(),
            running: HashMap::new(),
            completed: HashMap::new(),
            aborted: HashMap::new(),
            abort_on_start: HashSet::new(),
            counters: QueueCounters::default(),
        }
    }

    fn locate(&self, token: Token) -> Option<TaskState> {
        if self.running.contains_key(&token) {
            Some(TaskState::Running)
        } else if self.completed.contains_key(&token) {
            Some(TaskState::Completed)
        } else if self.aborted.contains_key(&token) {
            Some(TaskState::Aborted)
        } else if self.pending.iter().any(|t| t.token == token) {
            Some(TaskState::Pending)
        } else {
            None
        }
    }

    fn occupied(&self) -> usize {
        self.running.len() + self.completed.len()
    }
}

/// Shared state behind every [`AdmissionQueue`] handle.
pub(crate) struct QueueShared<R: TaskRunner> {
    name: String,
    max_in_parallel: usize,
    admission: AdmissionMode,
    state: Mutex<QueueState>,
    runner: R,
    audit: Option<Arc<dyn AuditSink>>,
}

impl<R: TaskRunner> QueueShared<R> {
    /// Record a transition. Called after the state lock is released.
    fn audit(&self, token: Token, action: QueueAction) {
        if let Some(sink) = &self.audit {
            sink.record(QueueEvent::now(self.name.as_str(), token, action));
        }
    }

    fn post_maybe_run(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.runner.post(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.maybe_run();
            }
        }));
    }

    fn maybe_run(&self) {
        while let Some((token, start)) = self.admit_next() {
            let abort = start();
            self.attach_abort(token, abort);
            if self.admission == AdmissionMode::OnePerTrigger {
                break;
            }
        }
    }

    /// Pop the pending head into running if a slot is free.
    fn admit_next(&self) -> Option<(Token, StartCallback)> {
        let (token, start) = {
            let mut state = self.state.lock();
            if state.occupied() >= self.max_in_parallel {
                return None;
            }
            let PendingTask { token, start } = state.pending.pop_front()?;
            state.running.insert(token, Task::new(token));
            state.counters.started += 1;
            debug!(
                queue = %self.name,
                token = %token,
                occupied = state.occupied(),
                "task admitted"
            );
            (token, start)
        };
        self.audit(token, QueueAction::Start);
        Some((token, start))
    }

    /// Store the abort callback returned by a start callback, unless the task
    /// left running while the callback executed.
    fn attach_abort(&self, token: Token, abort: AbortCallback) {
        let deferred = {
            let mut state = self.state.lock();
            if state.abort_on_start.remove(&token) {
                Some(abort)
            } else if let Some(task) = state.running.get_mut(&token) {
                task.abort = Some(abort);
                None
            } else {
                debug!(queue = %self.name, token = %token, "task finished during start");
                None
            }
        };
        if let Some(abort) = deferred {
            debug!(queue = %self.name, token = %token, "running abort deferred during start");
            abort.run();
        }
    }

    fn new_token(&self) -> Token {
        let mut state = self.state.lock();
        loop {
            let token = Token::new(state.next_token);
            state.next_token += 1;
            if state.locate(token).is_none() && !state.abort_on_start.contains(&token) {
                return token;
            }
        }
    }

    fn enqueue(self: &Arc<Self>, token: Token, start: StartCallback) -> Result<(), QueueError> {
        {
            let mut state = self.state.lock();
            if state.locate(token).is_some() || state.abort_on_start.contains(&token) {
                warn!(queue = %self.name, token = %token, "enqueue of live token rejected");
                return Err(QueueError::DuplicateToken(token));
            }
            state.pending.push_back(PendingTask { token, start });
            state.counters.enqueued += 1;
            debug!(queue = %self.name, token = %token, pending = state.pending.len(), "task enqueued");
        }
        self.audit(token, QueueAction::Enqueue);
        self.post_maybe_run();
        Ok(())
    }

    fn complete(&self, token: Token) -> Result<(), QueueError> {
        self.move_to_completed(&mut self.state.lock(), token)?;
        self.audit(token, QueueAction::Complete);
        Ok(())
    }

    pub(crate) fn complete_unless_aborted(&self, token: Token) -> Result<bool, QueueError> {
        {
            let mut state = self.state.lock();
            if state.aborted.contains_key(&token) {
                debug!(queue = %self.name, token = %token, "completion after abort ignored");
                return Ok(false);
            }
            self.move_to_completed(&mut state, token)?;
        }
        self.audit(token, QueueAction::Complete);
        Ok(true)
    }

    fn move_to_completed(&self, state: &mut QueueState, token: Token) -> Result<(), QueueError> {
        let Some(task) = state.running.remove(&token) else {
            warn!(queue = %self.name, token = %token, "complete of task that is not running");
            return Err(QueueError::NotRunning(token));
        };
        state.completed.insert(token, task);
        state.counters.completed += 1;
        debug!(queue = %self.name, token = %token, "task completed");
        Ok(())
    }

    fn remove(self: &Arc<Self>, token: Token) -> Result<(), QueueError> {
        let removed = {
            let mut state = self.state.lock();
            let removed = match state.completed.remove(&token) {
                Some(task) => task,
                None => match state.aborted.remove(&token) {
                    Some(task) => task,
                    None => {
                        warn!(queue = %self.name, token = %token, "remove of task that is not finished");
                        return Err(QueueError::NotRemovable(token));
                    }
                },
            };
            state.counters.removed += 1;
            debug!(queue = %self.name, token = %token, "task removed");
            removed
        };
        self.audit(token, QueueAction::Remove);
        // Callbacks are dropped outside the lock; their captures may touch the queue.
        drop(removed);
        self.post_maybe_run();
        Ok(())
    }

    fn abort(self: &Arc<Self>, token: Token) -> Result<(), QueueError> {
        let (callback, never_started) = {
            let mut state = self.state.lock();
            let (callback, never_started) = if let Some(mut task) = state.running.remove(&token) {
                let callback = task.abort.take();
                if callback.is_none() {
                    state.abort_on_start.insert(token);
                }
                state.aborted.insert(token, task);
                (callback, None)
            } else if let Some(pos) = state.pending.iter().position(|t| t.token == token) {
                let pending = state.pending.remove(pos);
                state.aborted.insert(token, Task::new(token));
                (None, pending)
            } else {
                warn!(
                    queue = %self.name,
                    token = %token,
                    state = ?state.locate(token),
                    "abort of task that is not abortable"
                );
                return Err(QueueError::NotAbortable(token));
            };
            state.counters.aborted += 1;
            debug!(
                queue = %self.name,
                token = %token,
                was_pending = never_started.is_some(),
                "task aborted"
            );
            (callback, never_started)
        };
        self.audit(token, QueueAction::Abort);
        drop(never_started);
        if let Some(callback) = callback {
            callback.run();
        }
        self.post_maybe_run();
        Ok(())
    }

    fn is_aborted(&self, token: Token) -> Result<bool, QueueError> {
        match self.state.lock().locate(token) {
            Some(state) => Ok(state == TaskState::Aborted),
            None => Err(QueueError::UnknownToken(token)),
        }
    }

    fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            max_in_parallel: self.max_in_parallel,
            pending: state.pending.len(),
            running: state.running.len(),
            completed: state.completed.len(),
            aborted: state.aborted.len(),
            enqueued_total: state.counters.enqueued,
            started_total: state.counters.started,
            completed_total: state.counters.completed,
            aborted_total: state.counters.aborted,
            removed_total: state.counters.removed,
        }
    }
}

/// Bounded FIFO admission queue.
///
/// Cloning yields another handle to the same queue.
///
/// # Example
///
/// ```
/// use prometheus_admission::config::QueueConfig;
/// use prometheus_admission::core::{AbortCallback, AdmissionQueue, TaskState};
/// use prometheus_admission::runtime::ManualTaskRunner;
///
/// let runner = ManualTaskRunner::new();
/// let queue = AdmissionQueue::new(QueueConfig::new().with_max_in_parallel(1), runner.clone()).unwrap();
///
/// let token = queue.new_token();
/// queue.enqueue(token, AbortCallback::noop).unwrap();
/// assert_eq!(queue.task_state(token), Some(TaskState::Pending));
///
/// runner.run_until_idle();
/// assert_eq!(queue.task_state(token), Some(TaskState::Running));
///
/// queue.complete(token).unwrap();
/// queue.remove(token).unwrap();
/// assert_eq!(queue.task_state(token), None);
/// ```
pub struct AdmissionQueue<R: TaskRunner> {
    shared: Arc<QueueShared<R>>,
}

impl<R: TaskRunner> Clone for AdmissionQueue<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R: TaskRunner> AdmissionQueue<R> {
    /// Create a queue named `default` with no audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: QueueConfig, runner: R) -> Result<Self, QueueError> {
        Self::with_parts("default", config, runner, None)
    }

    pub(crate) fn with_parts(
        name: impl Into<String>,
        config: QueueConfig,
        runner: R,
        audit: Option<Arc<dyn AuditSink>>,
    ) -> Result<Self, QueueError> {
        config.validate().map_err(QueueError::InvalidConfig)?;
        let name = name.into();
        info!(
            queue = %name,
            max_in_parallel = config.max_in_parallel,
            admission = ?config.admission,
            "admission queue created"
        );
        Ok(Self {
            shared: Arc::new(QueueShared {
                name,
                max_in_parallel: config.max_in_parallel,
                admission: config.admission,
                state: Mutex::new(QueueState::new()),
                runner,
                audit,
            }),
        })
    }

    /// Queue name used in logs and audit events.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Ceiling on running + completed tasks.
    #[must_use]
    pub fn max_in_parallel(&self) -> usize {
        self.shared.max_in_parallel
    }

    /// Return a token distinct from every token currently held by the queue.
    #[must_use]
    pub fn new_token(&self) -> Token {
        self.shared.new_token()
    }

    /// Append a task to pending and post a re-evaluation.
    ///
    /// `start` is never invoked synchronously, even when a slot is free.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::DuplicateToken`] if `token` is still held.
    pub fn enqueue<F>(&self, token: Token, start: F) -> Result<(), QueueError>
    where
        F: FnOnce() -> AbortCallback + Send + 'static,
    {
        self.shared.enqueue(token, Box::new(start))
    }

    /// Move a running task to completed. Its slot stays occupied until [`remove`](Self::remove).
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotRunning`] if `token` is not running.
    pub fn complete(&self, token: Token) -> Result<(), QueueError> {
        self.shared.complete(token)
    }

    /// Complete a running task, or return `Ok(false)` if it was aborted first.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotRunning`] if `token` is neither running nor aborted.
    pub fn complete_unless_aborted(&self, token: Token) -> Result<bool, QueueError> {
        self.shared.complete_unless_aborted(token)
    }

    /// Handle that lets in-flight work complete `token` without owning the queue.
    #[must_use]
    pub fn completer(&self, token: Token) -> Completer<R> {
        Completer::new(token, Arc::downgrade(&self.shared))
    }

    /// Destroy a completed or aborted task and post a re-evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotRemovable`] if `token` is pending, running or unknown.
    pub fn remove(&self, token: Token) -> Result<(), QueueError> {
        self.shared.remove(token)
    }

    /// Abort a pending or running task and post a re-evaluation.
    ///
    /// A running task's abort callback is invoked before this returns. A
    /// pending task's start callback is dropped without being invoked.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotAbortable`] if `token` is completed, already aborted or unknown.
    pub fn abort(&self, token: Token) -> Result<(), QueueError> {
        self.shared.abort(token)
    }

    /// Whether `token` is in the aborted collection.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::UnknownToken`] if the queue does not hold `token`.
    pub fn is_aborted(&self, token: Token) -> Result<bool, QueueError> {
        self.shared.is_aborted(token)
    }

    /// Collection `token` currently sits in, if any.
    #[must_use]
    pub fn task_state(&self, token: Token) -> Option<TaskState> {
        self.shared.state.lock().locate(token)
    }

    /// Snapshot of occupancy and counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.shared.stats()
    }
}

impl<R: TaskRunner> fmt::Debug for AdmissionQueue<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionQueue")
            .field("name", &self.shared.name)
            .field("stats", &self.shared.stats())
            .finish_non_exhaustive()
    }
}

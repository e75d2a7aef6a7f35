//! Periodic re-evaluation scheduler.
//!
//! A [`ProcessThread`] owns one dedicated OS thread that polls registered
//! [`Module`]s. Each module reports how long until it next wants to run; the
//! thread calls [`Module::process`] once that deadline passes and otherwise
//! sleeps on a condvar until the earliest deadline or an explicit wake-up.
//!
//! # Design
//!
//! - **One thread, no overlap**: modules are never processed concurrently with each other
//! - **Short critical sections**: the module lock covers the scan and bookkeeping only,
//!   never a `process()` call, so registration from other threads does not stall
//! - **No polling**: waits use `parking_lot::Condvar::wait_for` with a pending-wake flag,
//!   so a wake raised just before the wait is not lost

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::ProcessThreadConfig;
use crate::util::clock::{Clock, SystemClock};

use super::error::ProcessThreadError;

/// A long-lived worker driven by a [`ProcessThread`].
///
/// Both methods are called from the process thread only. A module that
/// blocks inside `process` stalls every other module on the same thread.
pub trait Module: Send + Sync {
    /// Milliseconds until `process` should next be called.
    ///
    /// Negative values are a defect in the module; they are logged and treated as zero.
    fn time_until_next_process(&self) -> i64;

    /// Do the periodic work.
    fn process(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deadline {
    /// Recomputed from `time_until_next_process` on the next scan.
    Unset,
    At(Instant),
    /// `process` is executing outside the lock.
    Processing,
}

struct ModuleEntry {
    module: Arc<dyn Module>,
    deadline: Deadline,
}

struct ThreadState {
    modules: Vec<ModuleEntry>,
    wake_pending: bool,
}

/// One spawned loop. Each loop owns its stop flag, so a loop detached by
/// `stop()` from inside a module stays stopped across later restarts.
struct LoopHandle {
    stop: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl LoopHandle {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

/// Clears the loop's `alive` flag when the thread exits, panics included.
struct AliveGuard(Arc<AtomicBool>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct ThreadShared<C: Clock> {
    state: Mutex<ThreadState>,
    wake: Condvar,
    clock: C,
    max_idle_wait: Duration,
}

fn data_ptr<M: ?Sized>(module: &Arc<M>) -> *const () {
    Arc::as_ptr(module).cast::<()>()
}

fn next_callback_time(module: &dyn Module, now: Instant) -> Instant {
    let interval = module.time_until_next_process();
    if interval < 0 {
        error!(interval, "time_until_next_process returned a negative interval");
    }
    now + Duration::from_millis(u64::try_from(interval).unwrap_or(0))
}

impl<C: Clock> ThreadShared<C> {
    fn signal(&self, state: &mut ThreadState) {
        state.wake_pending = true;
        self.wake.notify_all();
    }

    /// One scan over all modules. Returns how long to sleep, or `None` once stopped.
    fn process_once(&self, stop: &AtomicBool) -> Option<Duration> {
        let now = self.clock.now();
        let mut next_checkpoint = now + self.max_idle_wait;

        let due: Vec<Arc<dyn Module>> = {
            let mut state = self.state.lock();
            if stop.load(Ordering::Acquire) {
                return None;
            }
            let mut due = Vec::new();
            for entry in &mut state.modules {
                if entry.deadline == Deadline::Unset {
                    entry.deadline = Deadline::At(next_callback_time(entry.module.as_ref(), now));
                }
                match entry.deadline {
                    Deadline::At(at) if at <= now => {
                        entry.deadline = Deadline::Processing;
                        due.push(Arc::clone(&entry.module));
                    }
                    Deadline::At(at) => next_checkpoint = next_checkpoint.min(at),
                    Deadline::Unset | Deadline::Processing => {}
                }
            }
            due
        };

        for module in due {
            if stop.load(Ordering::Acquire) {
                return None;
            }
            module.process();
            // Fresh reference so a slow process() does not make the module fire again at once.
            let new_now = self.clock.now();
            let mut state = self.state.lock();
            let target = data_ptr(&module);
            if let Some(entry) = state
                .modules
                .iter_mut()
                .find(|e| data_ptr(&e.module) == target)
            {
                // Unset here means wake_up() ran during process(); leave it for the next scan.
                if entry.deadline == Deadline::Processing {
                    let at = next_callback_time(module.as_ref(), new_now);
                    entry.deadline = Deadline::At(at);
                    next_checkpoint = next_checkpoint.min(at);
                }
            }
        }

        Some(next_checkpoint.saturating_duration_since(self.clock.now()))
    }

    fn wait(&self, timeout: Duration, stop: &AtomicBool) {
        let mut state = self.state.lock();
        if !state.wake_pending && !stop.load(Ordering::Acquire) && !timeout.is_zero() {
            let _ = self.wake.wait_for(&mut state, timeout);
        }
        state.wake_pending = false;
    }

    fn run(&self, stop: &AtomicBool) {
        while let Some(wait) = self.process_once(stop) {
            self.wait(wait, stop);
        }
    }
}

/// Dedicated thread that periodically processes registered modules.
///
/// Construct one explicitly and share it (for example behind an `Arc`) with
/// every component that registers modules.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use prometheus_admission::config::ProcessThreadConfig;
/// use prometheus_admission::core::{Module, ProcessThread};
///
/// struct Ticker(AtomicUsize);
///
/// impl Module for Ticker {
///     fn time_until_next_process(&self) -> i64 { 5 }
///     fn process(&self) { self.0.fetch_add(1, Ordering::Relaxed); }
/// }
///
/// let thread = ProcessThread::new(ProcessThreadConfig::default()).unwrap();
/// let ticker = Arc::new(Ticker(AtomicUsize::new(0)));
/// thread.register_module(ticker.clone()).unwrap();
/// thread.start().unwrap();
/// std::thread::sleep(std::time::Duration::from_millis(50));
/// thread.stop();
/// assert!(ticker.0.load(Ordering::Relaxed) > 0);
/// ```
pub struct ProcessThread<C: Clock = SystemClock> {
    config: ProcessThreadConfig,
    shared: Arc<ThreadShared<C>>,
    thread: Mutex<Option<LoopHandle>>,
}

impl ProcessThread<SystemClock> {
    /// Create an idle process thread using the system clock.
    ///
    /// # Errors
    ///
    /// Returns `ProcessThreadError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: ProcessThreadConfig) -> Result<Self, ProcessThreadError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> ProcessThread<C> {
    /// Create an idle process thread measuring deadlines with `clock`.
    ///
    /// # Errors
    ///
    /// Returns `ProcessThreadError::InvalidConfig` if the configuration is invalid.
    pub fn with_clock(config: ProcessThreadConfig, clock: C) -> Result<Self, ProcessThreadError> {
        config.validate().map_err(ProcessThreadError::InvalidConfig)?;
        let max_idle_wait = Duration::from_millis(config.max_idle_wait_ms);
        Ok(Self {
            config,
            shared: Arc::new(ThreadShared {
                state: Mutex::new(ThreadState {
                    modules: Vec::new(),
                    wake_pending: false,
                }),
                wake: Condvar::new(),
                clock,
                max_idle_wait,
            }),
            thread: Mutex::new(None),
        })
    }

    /// Spawn the processing thread.
    ///
    /// # Errors
    ///
    /// - `ProcessThreadError::AlreadyRunning` if the thread is already started
    /// - `ProcessThreadError::Spawn` if the OS thread could not be created
    pub fn start(&self) -> Result<(), ProcessThreadError> {
        let mut slot = self.thread.lock();
        if let Some(previous) = slot.as_mut() {
            // A loop told to stop from inside a module counts as running until it exits.
            if previous.is_alive() {
                warn!(thread_name = %self.config.thread_name, "process thread already running");
                return Err(ProcessThreadError::AlreadyRunning);
            }
            if let Some(join) = previous.join.take() {
                if join.join().is_err() {
                    error!(thread_name = %self.config.thread_name, "process thread panicked");
                }
            }
            *slot = None;
        }

        let stop = Arc::new(AtomicBool::new(false));
        let alive = Arc::new(AtomicBool::new(true));
        let shared = Arc::clone(&self.shared);
        let loop_stop = Arc::clone(&stop);
        let guard = AliveGuard(Arc::clone(&alive));
        let mut builder = thread::Builder::new().name(self.config.thread_name.clone());
        if let Some(stack_size) = self.config.stack_size {
            builder = builder.stack_size(stack_size);
        }
        let join = builder.spawn(move || {
            let _guard = guard;
            debug!("process thread loop started");
            shared.run(&loop_stop);
            debug!("process thread loop exiting");
        })?;
        *slot = Some(LoopHandle {
            stop,
            alive,
            join: Some(join),
        });

        info!(
            thread_name = %self.config.thread_name,
            max_idle_wait_ms = self.config.max_idle_wait_ms,
            "process thread started"
        );
        Ok(())
    }

    /// Signal the loop to exit and join it.
    ///
    /// Once this returns, no `process()` call from this thread is in flight.
    /// Calling it when idle is a no-op. The thread can be started again afterwards.
    ///
    /// Called from inside a module, the loop is only flagged: it exits once
    /// the current `process()` returns, and [`start`](Self::start) reports
    /// `AlreadyRunning` until then. If another thread is already joining the
    /// loop, this returns without waiting for it.
    pub fn stop(&self) {
        let (join, loop_stop) = {
            let mut slot = self.thread.lock();
            let Some(current) = slot.as_mut() else {
                return;
            };
            // Set under the slot lock so a concurrent start() cannot slip in first.
            current.stop.store(true, Ordering::Release);
            self.shared.signal(&mut self.shared.state.lock());

            let Some(join) = current.join.take() else {
                debug!(thread_name = %self.config.thread_name, "process thread already stopping");
                return;
            };
            if join.thread().id() == thread::current().id() {
                current.join = Some(join);
                warn!(thread_name = %self.config.thread_name, "stop called from the process thread; not joining");
                return;
            }
            (join, Arc::clone(&current.stop))
        };

        // Joined without the slot lock so a module calling is_running() cannot deadlock.
        if join.join().is_err() {
            error!(thread_name = %self.config.thread_name, "process thread panicked");
        }
        let mut slot = self.thread.lock();
        if slot
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(&current.stop, &loop_stop))
        {
            *slot = None;
        }
        info!(thread_name = %self.config.thread_name, "process thread stopped");
    }

    /// Whether a loop has been started and has not yet exited.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.lock().as_ref().is_some_and(LoopHandle::is_alive)
    }

    /// Add `module` with an unset deadline and wake the loop.
    ///
    /// Callable from any thread.
    ///
    /// # Errors
    ///
    /// Returns `ProcessThreadError::ModuleAlreadyRegistered` if this exact instance is registered.
    pub fn register_module(&self, module: Arc<dyn Module>) -> Result<(), ProcessThreadError> {
        let mut state = self.shared.state.lock();
        let target = data_ptr(&module);
        if state.modules.iter().any(|e| data_ptr(&e.module) == target) {
            warn!("module registered twice");
            return Err(ProcessThreadError::ModuleAlreadyRegistered);
        }
        state.modules.push(ModuleEntry {
            module,
            deadline: Deadline::Unset,
        });
        debug!(modules = state.modules.len(), "module registered");
        // The new module's deadline may be earlier than the one being waited for.
        self.shared.signal(&mut state);
        Ok(())
    }

    /// Remove `module` if registered. Returns whether it was found.
    pub fn deregister_module<M: ?Sized>(&self, module: &Arc<M>) -> bool {
        let mut state = self.shared.state.lock();
        let target = data_ptr(module);
        let before = state.modules.len();
        state.modules.retain(|e| data_ptr(&e.module) != target);
        let removed = state.modules.len() != before;
        debug!(removed, modules = state.modules.len(), "module deregistered");
        removed
    }

    /// Discard `module`'s cached deadline and wake the loop so it is re-queried promptly.
    pub fn wake_up<M: ?Sized>(&self, module: &Arc<M>) {
        let mut state = self.shared.state.lock();
        let target = data_ptr(module);
        for entry in state.modules.iter_mut().filter(|e| data_ptr(&e.module) == target) {
            entry.deadline = Deadline::Unset;
        }
        self.shared.signal(&mut state);
    }

    /// Number of registered modules.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.shared.state.lock().modules.len()
    }

    /// Thread configuration.
    #[must_use]
    pub const fn config(&self) -> &ProcessThreadConfig {
        &self.config
    }
}

impl<C: Clock> Drop for ProcessThread<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<C: Clock> fmt::Debug for ProcessThread<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessThread")
            .field("thread_name", &self.config.thread_name)
            .field("running", &self.is_running())
            .field("modules", &self.module_count())
            .finish()
    }
}

//! Sequenced task runner backed by one dedicated OS thread.
//!
//! Posted closures are sent over a `crossbeam_channel` and executed in
//! posting order on the runner's thread. Dropping the sender is the shutdown
//! signal: the thread drains what was already posted, then exits.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::core::{PostedTask, TaskRunner};

/// Runs posted closures one at a time on a named thread.
pub struct ThreadTaskRunner {
    name: String,
    task_tx: Mutex<Option<Sender<PostedTask>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    executed: Arc<AtomicU64>,
}

impl ThreadTaskRunner {
    /// Spawn the runner thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn new(name: impl Into<String>) -> io::Result<Self> {
        let name = name.into();
        let (task_tx, task_rx) = unbounded::<PostedTask>();
        let executed = Arc::new(AtomicU64::new(0));
        let worker = spawn_runner(&name, task_rx, Arc::clone(&executed))?;
        info!(runner = %name, "thread task runner started");
        Ok(Self {
            name,
            task_tx: Mutex::new(Some(task_tx)),
            worker: Mutex::new(Some(worker)),
            executed,
        })
    }

    /// Closures executed so far.
    #[must_use]
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Acquire)
    }

    /// Thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop accepting work, let the thread drain its backlog, and join it.
    ///
    /// Safe to call more than once. When called from the runner thread itself
    /// the thread is detached instead of joined.
    pub fn shutdown(&self) {
        // Dropping the sender unblocks recv() once the backlog is empty.
        self.task_tx.lock().take();

        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            debug!(runner = %self.name, "shutdown from runner thread; detaching");
            return;
        }
        if worker.join().is_err() {
            error!(runner = %self.name, "runner thread panicked");
        }
        info!(runner = %self.name, executed = self.executed(), "thread task runner stopped");
    }
}

impl TaskRunner for ThreadTaskRunner {
    fn post(&self, task: PostedTask) {
        let task_tx = self.task_tx.lock();
        let Some(sender) = task_tx.as_ref() else {
            warn!(runner = %self.name, "post after shutdown; task dropped");
            return;
        };
        if sender.send(task).is_err() {
            warn!(runner = %self.name, "runner thread gone; task dropped");
        }
    }
}

impl Drop for ThreadTaskRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ThreadTaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadTaskRunner")
            .field("name", &self.name)
            .field("executed", &self.executed())
            .finish_non_exhaustive()
    }
}

fn spawn_runner(
    name: &str,
    task_rx: Receiver<PostedTask>,
    executed: Arc<AtomicU64>,
) -> io::Result<JoinHandle<()>> {
    let runner = name.to_string();
    thread::Builder::new().name(name.to_string()).spawn(move || {
        debug!(runner = %runner, "runner thread started");
        // Blocking recv; returns Err once every sender is gone and the channel is empty.
        while let Ok(task) = task_rx.recv() {
            task();
            executed.fetch_add(1, Ordering::AcqRel);
        }
        debug!(runner = %runner, "runner thread exiting");
    })
}

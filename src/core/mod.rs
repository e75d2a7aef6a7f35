//! Admission queue, cancellation protocol, and the periodic process thread.

pub mod audit;
pub mod cancel;
pub mod error;
pub mod process_thread;
pub mod queue;
pub mod task;
pub mod task_runner;

pub use audit::{AuditSink, InMemoryAuditSink, QueueAction, QueueEvent};
pub use cancel::{AbortCallback, AbortSignal, Completer, StartCallback};
pub use error::{AppResult, ProcessThreadError, QueueError};
pub use process_thread::{Module, ProcessThread};
pub use queue::{AdmissionQueue, QueueStats};
pub use task::{TaskState, Token};
pub use task_runner::{PostedTask, TaskRunner};

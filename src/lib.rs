//! # Prometheus Admission
//!
//! Bounded-concurrency admission control for asynchronous operations, with
//! cooperative cancellation and a periodic re-evaluation thread.
//!
//! ## Core Problem Solved
//!
//! Some subsystems must never run more than N operations of a kind at once,
//! yet callers submit work whenever they like and may lose interest at any
//! moment:
//!
//! - **Bounded Concurrency**: At most `max_in_parallel` tasks occupy a slot, counting
//!   tasks that finished but whose results are still being consumed
//! - **Fair Ordering**: Waiting tasks start strictly in submission order
//! - **Cancellation**: A waiting task can be withdrawn before it starts; a running task
//!   is told to stop through the abort callback it returned when it started
//! - **Reentrancy**: Start and abort callbacks may call back into the queue freely
//!
//! ## AdmissionQueue
//!
//! Every admission decision is posted to a [`TaskRunner`](core::TaskRunner), so a
//! start callback never runs inside `enqueue`, `complete`, `remove` or `abort`.
//!
//! ```rust
//! use prometheus_admission::config::QueueConfig;
//! use prometheus_admission::core::{AbortSignal, AdmissionQueue, TaskState};
//! use prometheus_admission::runtime::ManualTaskRunner;
//!
//! let runner = ManualTaskRunner::new();
//! let queue = AdmissionQueue::new(QueueConfig::new().with_max_in_parallel(2), runner.clone()).unwrap();
//!
//! let signal = AbortSignal::new();
//! let token = queue.new_token();
//! let task_signal = signal.clone();
//! queue.enqueue(token, move || task_signal.abort_callback()).unwrap();
//!
//! runner.run_until_idle();
//! assert_eq!(queue.task_state(token), Some(TaskState::Running));
//!
//! queue.abort(token).unwrap();
//! assert!(signal.is_aborted());
//! assert!(queue.is_aborted(token).unwrap());
//! queue.remove(token).unwrap();
//! ```
//!
//! ## ProcessThread
//!
//! A single dedicated thread polling registered [`Module`](core::Module)s and
//! calling each one once its self-reported interval elapses.
//!
//! ```rust,ignore
//! let thread = ProcessThread::new(ProcessThreadConfig::default())?;
//! thread.register_module(Arc::new(my_module))?;
//! thread.start()?;
//! // ...
//! thread.stop();
//! ```
//!
//! ## Runners
//!
//! - [`ManualTaskRunner`](runtime::ManualTaskRunner): queues posted closures until the caller drains them
//! - [`ThreadTaskRunner`](runtime::ThreadTaskRunner): one dedicated OS thread
//! - `TokioTaskRunner`: spawns onto a tokio runtime (feature `tokio-runtime`)

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Admission queue, cancellation, audit and the process thread.
pub mod core;
/// Configuration models for queues and the process thread.
pub mod config;
/// Builders to construct queues and the process thread from configuration.
pub mod builders;
/// Task runners that execute posted re-evaluations.
pub mod runtime;
/// Shared utilities.
pub mod util;

//! Configuration models for queues and the process thread.

pub mod core_config;
pub mod process_thread;
pub mod queue;

pub use core_config::{
    CoreConfig, CONFIG_PATH_VAR, DEFAULT_QUEUE, MAX_IN_PARALLEL_VAR, PROCESS_IDLE_MS_VAR,
};
pub use process_thread::ProcessThreadConfig;
pub use queue::{AdmissionMode, QueueConfig};

//! Builders to construct queues and the process thread from configuration.

pub mod queue_builder;

pub use queue_builder::{build_process_thread, build_queues, QueueBuilder};

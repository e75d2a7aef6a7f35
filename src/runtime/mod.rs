//! Task runner implementations the queue can post re-evaluations onto.

pub mod manual;
pub mod thread_runner;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_runner;

pub use manual::ManualTaskRunner;
pub use thread_runner::ThreadTaskRunner;
#[cfg(feature = "tokio-runtime")]
pub use tokio_runner::TokioTaskRunner;

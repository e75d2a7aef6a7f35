//! Process thread configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`ProcessThread`](crate::core::ProcessThread).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessThreadConfig {
    /// OS thread name.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
    /// Longest sleep between scans when no module is due sooner, in milliseconds.
    #[serde(default = "default_max_idle_wait_ms")]
    pub max_idle_wait_ms: u64,
    /// Stack size for the thread; platform default when `None`.
    #[serde(default)]
    pub stack_size: Option<usize>,
}

fn default_thread_name() -> String {
    "process-thread".into()
}

const fn default_max_idle_wait_ms() -> u64 {
    60_000
}

impl Default for ProcessThreadConfig {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            max_idle_wait_ms: default_max_idle_wait_ms(),
            stack_size: None,
        }
    }
}

impl ProcessThreadConfig {
    /// Set the thread name.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the idle wait cap.
    #[must_use]
    pub const fn with_max_idle_wait_ms(mut self, ms: u64) -> Self {
        self.max_idle_wait_ms = ms;
        self
    }

    /// Set the stack size.
    #[must_use]
    pub const fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message for an empty thread name, a zero idle wait, or a zero stack size.
    pub fn validate(&self) -> Result<(), String> {
        if self.thread_name.trim().is_empty() {
            return Err("thread_name must not be empty".into());
        }
        if self.max_idle_wait_ms == 0 {
            return Err("max_idle_wait_ms must be greater than 0".into());
        }
        if self.stack_size == Some(0) {
            return Err("stack_size must be greater than 0".into());
        }
        Ok(())
    }
}

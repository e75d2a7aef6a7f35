//! Admission queue configuration.

use serde::{Deserialize, Serialize};

/// How many pending tasks a single re-evaluation may admit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    /// Keep admitting until the ceiling is reached or pending is empty.
    #[default]
    FillCapacity,
    /// Admit at most one task per posted re-evaluation.
    OnePerTrigger,
}

/// Configuration for one admission queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Ceiling on running + completed-but-not-removed tasks.
    #[serde(default = "default_max_in_parallel")]
    pub max_in_parallel: usize,
    /// Admission behaviour per re-evaluation.
    #[serde(default)]
    pub admission: AdmissionMode,
}

const fn default_max_in_parallel() -> usize {
    1
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_in_parallel: default_max_in_parallel(),
            admission: AdmissionMode::default(),
        }
    }
}

impl QueueConfig {
    /// Default configuration: one task at a time, fill capacity on each trigger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ceiling.
    #[must_use]
    pub const fn with_max_in_parallel(mut self, max_in_parallel: usize) -> Self {
        self.max_in_parallel = max_in_parallel;
        self
    }

    /// Set the admission mode.
    #[must_use]
    pub const fn with_admission(mut self, admission: AdmissionMode) -> Self {
        self.admission = admission;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message if `max_in_parallel` is zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_in_parallel == 0 {
            return Err("max_in_parallel must be greater than 0".into());
        }
        Ok(())
    }
}

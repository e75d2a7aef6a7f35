//! Root configuration covering every queue and the process thread.

use std::collections::HashMap;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use super::{ProcessThreadConfig, QueueConfig};
use crate::core::AppResult;

/// Environment variable naming a JSON configuration file.
pub const CONFIG_PATH_VAR: &str = "ADMISSION_CONFIG";
/// Environment variable overriding the default queue's ceiling.
pub const MAX_IN_PARALLEL_VAR: &str = "ADMISSION_MAX_IN_PARALLEL";
/// Environment variable overriding the process thread idle wait.
pub const PROCESS_IDLE_MS_VAR: &str = "ADMISSION_PROCESS_IDLE_MS";

/// Name of the queue created when configuration comes from plain variables.
pub const DEFAULT_QUEUE: &str = "default";

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Map of queue name to configuration.
    pub queues: HashMap<String, QueueConfig>,
    /// Process thread configuration.
    #[serde(default)]
    pub process_thread: ProcessThreadConfig,
}

impl CoreConfig {
    /// A configuration with one queue named [`DEFAULT_QUEUE`].
    #[must_use]
    pub fn single(queue: QueueConfig) -> Self {
        Self {
            queues: HashMap::from([(DEFAULT_QUEUE.to_string(), queue)]),
            process_thread: ProcessThreadConfig::default(),
        }
    }

    /// Validate all queues, the process thread, and ensure at least one queue exists.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid section.
    pub fn validate(&self) -> Result<(), String> {
        if self.queues.is_empty() {
            return Err("at least one queue must be defined".into());
        }
        for (name, queue) in &self.queues {
            queue
                .validate()
                .map_err(|e| format!("queue `{name}` invalid: {e}"))?;
        }
        self.process_thread
            .validate()
            .map_err(|e| format!("process_thread invalid: {e}"))
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message on parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment, after reading `.env` if present.
    ///
    /// If `ADMISSION_CONFIG` names a file, that JSON file is the whole
    /// configuration. Otherwise a single default queue is built and
    /// `ADMISSION_MAX_IN_PARALLEL` / `ADMISSION_PROCESS_IDLE_MS` override its defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, a variable does not parse, or validation fails.
    pub fn from_env() -> AppResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(anyhow!(e).context("loading .env"));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, a variable does not parse, or validation fails.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(CONFIG_PATH_VAR) {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading configuration file {path}"))?;
            return Self::from_json_str(&text).map_err(|e| anyhow!("{path}: {e}"));
        }

        let mut queue = QueueConfig::default();
        if let Some(raw) = lookup(MAX_IN_PARALLEL_VAR) {
            queue.max_in_parallel = raw
                .trim()
                .parse()
                .with_context(|| format!("{MAX_IN_PARALLEL_VAR}={raw}"))?;
        }
        let mut cfg = Self::single(queue);
        if let Some(raw) = lookup(PROCESS_IDLE_MS_VAR) {
            cfg.process_thread.max_idle_wait_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("{PROCESS_IDLE_MS_VAR}={raw}"))?;
        }
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

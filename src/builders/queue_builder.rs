//! Build admission queues and the process thread from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{CoreConfig, ProcessThreadConfig, QueueConfig};
use crate::core::{AdmissionQueue, AuditSink, ProcessThread, ProcessThreadError, QueueError, TaskRunner};

/// Builder for a single named [`AdmissionQueue`].
pub struct QueueBuilder {
    name: String,
    config: QueueConfig,
    audit: Option<Arc<dyn AuditSink>>,
}

impl QueueBuilder {
    /// Start a builder for queue `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, config: QueueConfig) -> Self {
        Self {
            name: name.into(),
            config,
            audit: None,
        }
    }

    /// Record every state transition of the built queue in `sink`.
    #[must_use]
    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Queue name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue configuration.
    #[must_use]
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Build the queue on `runner`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidConfig`] if the configuration fails validation.
    pub fn build<R: TaskRunner>(self, runner: R) -> Result<AdmissionQueue<R>, QueueError> {
        AdmissionQueue::with_parts(self.name, self.config, runner, self.audit)
    }
}

impl std::fmt::Debug for QueueBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueBuilder")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("audit", &self.audit.is_some())
            .finish()
    }
}

/// Build every queue named in `cfg`, asking `runner_factory` for each queue's runner.
///
/// # Errors
///
/// Returns [`QueueError::InvalidConfig`] if `cfg` fails validation.
pub fn build_queues<R, F>(
    cfg: &CoreConfig,
    mut runner_factory: F,
) -> Result<HashMap<String, AdmissionQueue<R>>, QueueError>
where
    R: TaskRunner,
    F: FnMut(&str, &QueueConfig) -> R,
{
    cfg.validate().map_err(QueueError::InvalidConfig)?;

    let mut queues = HashMap::with_capacity(cfg.queues.len());
    for (name, queue_cfg) in &cfg.queues {
        let runner = runner_factory(name, queue_cfg);
        let queue = QueueBuilder::new(name.clone(), queue_cfg.clone()).build(runner)?;
        queues.insert(name.clone(), queue);
    }

    Ok(queues)
}

/// Build a stopped process thread; call [`ProcessThread::start`] to run it.
///
/// # Errors
///
/// Returns [`ProcessThreadError::InvalidConfig`] if `cfg` fails validation.
pub fn build_process_thread(cfg: &ProcessThreadConfig) -> Result<ProcessThread, ProcessThreadError> {
    ProcessThread::new(cfg.clone())
}

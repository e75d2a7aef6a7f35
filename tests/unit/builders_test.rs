//! Tests for builder modules

use std::collections::HashMap;
use std::sync::Arc;

use prometheus_admission::builders::{build_process_thread, build_queues, QueueBuilder};
use prometheus_admission::config::{CoreConfig, ProcessThreadConfig, QueueConfig};
use prometheus_admission::core::{AbortCallback, AuditSink, InMemoryAuditSink, QueueAction, QueueError};
use prometheus_admission::runtime::ManualTaskRunner;

#[test]
fn test_queue_builder_defaults() {
    let builder = QueueBuilder::new("uploads", QueueConfig::new().with_max_in_parallel(4));
    assert_eq!(builder.name(), "uploads");
    assert_eq!(builder.config().max_in_parallel, 4);

    let queue = builder.build(ManualTaskRunner::new()).unwrap();
    assert_eq!(queue.name(), "uploads");
    assert_eq!(queue.max_in_parallel(), 4);
}

#[test]
fn test_queue_builder_rejects_zero_ceiling() {
    let result = QueueBuilder::new("bad", QueueConfig::new().with_max_in_parallel(0))
        .build(ManualTaskRunner::new());
    assert!(matches!(result, Err(QueueError::InvalidConfig(_))));
}

#[test]
fn test_queue_builder_audit() {
    let sink = Arc::new(InMemoryAuditSink::new(16));
    let queue = QueueBuilder::new("audited", QueueConfig::new())
        .with_audit(Arc::clone(&sink) as Arc<dyn AuditSink>)
        .build(ManualTaskRunner::new())
        .unwrap();
    let token = queue.new_token();
    queue.enqueue(token, AbortCallback::noop).unwrap();
    assert_eq!(sink.tokens_for(QueueAction::Enqueue), vec![token]);
}

#[test]
fn test_build_queues_one_runner_per_queue() {
    let cfg = CoreConfig {
        queues: HashMap::from([
            ("a".to_string(), QueueConfig::new().with_max_in_parallel(1)),
            ("b".to_string(), QueueConfig::new().with_max_in_parallel(3)),
        ]),
        process_thread: ProcessThreadConfig::default(),
    };
    let mut asked = Vec::new();
    let queues = build_queues(&cfg, |name, _| {
        asked.push(name.to_string());
        ManualTaskRunner::new()
    })
    .unwrap();

    asked.sort();
    assert_eq!(asked, vec!["a", "b"]);
    assert_eq!(queues["b"].max_in_parallel(), 3);
    assert_eq!(queues["a"].name(), "a");
}

#[test]
fn test_build_queues_rejects_empty_config() {
    let cfg = CoreConfig {
        queues: HashMap::new(),
        process_thread: ProcessThreadConfig::default(),
    };
    let result = build_queues(&cfg, |_, _| ManualTaskRunner::new());
    assert!(matches!(result, Err(QueueError::InvalidConfig(_))));
}

#[test]
fn test_build_process_thread_is_stopped() {
    let thread = build_process_thread(&ProcessThreadConfig::default().with_thread_name("builder")).unwrap();
    assert!(!thread.is_running());
    assert_eq!(thread.config().thread_name, "builder");
    assert!(build_process_thread(&ProcessThreadConfig::default().with_max_idle_wait_ms(0)).is_err());
}

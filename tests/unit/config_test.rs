//! Tests for configuration validation

use std::collections::HashMap;

use prometheus_admission::config::{
    AdmissionMode, CoreConfig, CONFIG_PATH_VAR, ProcessThreadConfig, QueueConfig, DEFAULT_QUEUE,
    MAX_IN_PARALLEL_VAR, PROCESS_IDLE_MS_VAR,
};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_queue_config_validation() {
    assert!(QueueConfig::new().validate().is_ok());
    assert!(QueueConfig::new().with_max_in_parallel(0).validate().is_err());
}

#[test]
fn test_process_thread_config_validation() {
    assert!(ProcessThreadConfig::default().validate().is_ok());
    assert!(ProcessThreadConfig::default().with_thread_name("  ").validate().is_err());
    assert!(ProcessThreadConfig::default().with_max_idle_wait_ms(0).validate().is_err());
    assert!(ProcessThreadConfig::default().with_stack_size(0).validate().is_err());
}

#[test]
fn test_core_config_from_json() {
    let json = r#"{
        "queues": {
            "uploads": { "max_in_parallel": 2 },
            "downloads": { "max_in_parallel": 5, "admission": "one_per_trigger" }
        },
        "process_thread": { "thread_name": "ticker", "max_idle_wait_ms": 1000 }
    }"#;
    let cfg = CoreConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.queues["uploads"].max_in_parallel, 2);
    assert_eq!(cfg.queues["uploads"].admission, AdmissionMode::FillCapacity);
    assert_eq!(cfg.queues["downloads"].admission, AdmissionMode::OnePerTrigger);
    assert_eq!(cfg.process_thread.thread_name, "ticker");
    assert_eq!(cfg.process_thread.stack_size, None);
}

#[test]
fn test_core_config_process_thread_defaults() {
    let cfg = CoreConfig::from_json_str(r#"{ "queues": { "q": {} } }"#).unwrap();
    assert_eq!(cfg.process_thread, ProcessThreadConfig::default());
    assert_eq!(cfg.process_thread.max_idle_wait_ms, 60_000);
}

#[test]
fn test_core_config_rejects_invalid_queue() {
    let err = CoreConfig::from_json_str(r#"{ "queues": { "q": { "max_in_parallel": 0 } } }"#).unwrap_err();
    assert!(err.contains("queue `q` invalid"));
    assert!(CoreConfig::from_json_str(r#"{ "queues": {} }"#).is_err());
    assert!(CoreConfig::from_json_str("not json").unwrap_err().starts_with("parse error"));
}

#[test]
fn test_from_lookup_defaults() {
    let cfg = CoreConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(cfg, CoreConfig::single(QueueConfig::default()));
    assert!(cfg.queues.contains_key(DEFAULT_QUEUE));
}

#[test]
fn test_from_lookup_overrides() {
    let cfg = CoreConfig::from_lookup(lookup(&[
        (MAX_IN_PARALLEL_VAR, " 8 "),
        (PROCESS_IDLE_MS_VAR, "250"),
    ]))
    .unwrap();
    assert_eq!(cfg.queues[DEFAULT_QUEUE].max_in_parallel, 8);
    assert_eq!(cfg.process_thread.max_idle_wait_ms, 250);
}

#[test]
fn test_from_lookup_rejects_bad_values() {
    assert!(CoreConfig::from_lookup(lookup(&[(MAX_IN_PARALLEL_VAR, "many")])).is_err());
    assert!(CoreConfig::from_lookup(lookup(&[(MAX_IN_PARALLEL_VAR, "0")])).is_err());
    assert!(CoreConfig::from_lookup(lookup(&[(PROCESS_IDLE_MS_VAR, "-1")])).is_err());
}

#[test]
fn test_from_lookup_reads_config_file() {
    let path = std::env::temp_dir().join(format!("admission-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "queues": { "files": { "max_in_parallel": 3 } } }"#).unwrap();
    let path_str = path.to_string_lossy().into_owned();

    let cfg = CoreConfig::from_lookup(lookup(&[(CONFIG_PATH_VAR, path_str.as_str())])).unwrap();
    assert_eq!(cfg.queues["files"].max_in_parallel, 3);
    std::fs::remove_file(&path).unwrap();

    assert!(CoreConfig::from_lookup(lookup(&[(CONFIG_PATH_VAR, path_str.as_str())])).is_err());
}

//! Tests for error types

use prometheus_admission::core::{ProcessThreadError, QueueError, Token};

#[test]
fn test_duplicate_token_error() {
    let err = QueueError::DuplicateToken(Token::new(7));
    assert_eq!(format!("{}", err), "token #7 is already queued");
}

#[test]
fn test_not_running_error() {
    let err = QueueError::NotRunning(Token::new(3));
    assert_eq!(format!("{}", err), "token #3 is not running");
}

#[test]
fn test_not_removable_error() {
    let err = QueueError::NotRemovable(Token::new(1));
    assert_eq!(format!("{}", err), "token #1 is neither completed nor aborted");
}

#[test]
fn test_invalid_config_error() {
    let err = QueueError::InvalidConfig("max_in_parallel must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: max_in_parallel must be greater than 0"
    );
}

#[test]
fn test_spawn_error_from_io() {
    let err: ProcessThreadError = std::io::Error::other("no threads left").into();
    assert!(matches!(err, ProcessThreadError::Spawn(_)));
    assert_eq!(format!("{}", err), "failed to spawn process thread: no threads left");
}

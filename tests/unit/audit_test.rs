//! Tests for audit sink

use prometheus_admission::core::{AuditSink, InMemoryAuditSink, QueueAction, QueueEvent, Token};

#[test]
fn test_in_memory_audit_sink() {
    let sink = InMemoryAuditSink::new(10);

    sink.record(QueueEvent::now("pool1", Token::new(1), QueueAction::Enqueue));
    sink.record(QueueEvent::now("pool1", Token::new(1), QueueAction::Start));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].queue, "pool1");
    assert_eq!(events[0].token, Token::new(1));
    assert_eq!(events[1].action, QueueAction::Start);
    assert!(events[0].created_at_ms > 0);
}

#[test]
fn test_audit_sink_overflow() {
    let sink = InMemoryAuditSink::new(2);

    sink.record(QueueEvent::now("pool1", Token::new(1), QueueAction::Enqueue));
    sink.record(QueueEvent::now("pool1", Token::new(2), QueueAction::Enqueue));
    sink.record(QueueEvent::now("pool1", Token::new(3), QueueAction::Abort));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].token, Token::new(2)); // First one popped
    assert_eq!(sink.tokens_for(QueueAction::Abort), vec![Token::new(3)]);
}

#[test]
fn test_event_serializes_snake_case_action() {
    let event = QueueEvent {
        queue: "uploads".to_string(),
        token: Token::new(4),
        action: QueueAction::Remove,
        created_at_ms: 10,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["action"], "remove");
    assert_eq!(json["token"], 4);
    assert_eq!(json["queue"], "uploads");
}

//! Audit trail of queue lifecycle transitions.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::task::Token;
use crate::util::clock::now_ms;

/// Transition recorded for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueAction {
    /// Appended to pending.
    Enqueue,
    /// Admitted and start callback invoked.
    Start,
    /// Reported finished.
    Complete,
    /// Cancelled.
    Abort,
    /// Acknowledged and destroyed.
    Remove,
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEvent {
    /// Queue name, as given to the builder.
    pub queue: String,
    /// Related task token.
    pub token: Token,
    /// Action taken.
    pub action: QueueAction,
    /// Wall-clock timestamp in milliseconds since epoch.
    pub created_at_ms: u128,
}

impl QueueEvent {
    /// Build an event stamped with the current wall-clock time.
    pub fn now(queue: impl Into<String>, token: Token, action: QueueAction) -> Self {
        Self {
            queue: queue.into(),
            token,
            action,
            created_at_ms: now_ms(),
        }
    }
}

/// Audit sink abstraction.
///
/// Called after the queue's state lock is released. Events from operations
/// racing on different threads may arrive in either order.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: QueueEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: Mutex<VecDeque<QueueEvent>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<QueueEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Tokens that recorded `action`, in the order they were recorded.
    #[must_use]
    pub fn tokens_for(&self, action: QueueAction) -> Vec<Token> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.action == action)
            .map(|e| e.token)
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: QueueEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_buffer_drops_oldest() {
        let sink = InMemoryAuditSink::new(2);
        for raw in 1..=3 {
            sink.record(QueueEvent::now("q", Token::new(raw), QueueAction::Enqueue));
        }
        assert_eq!(sink.tokens_for(QueueAction::Enqueue), vec![Token::new(2), Token::new(3)]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let sink = InMemoryAuditSink::new(0);
        sink.record(QueueEvent::now("q", Token::new(1), QueueAction::Enqueue));
        sink.record(QueueEvent::now("q", Token::new(2), QueueAction::Start));
        assert!(sink.events().is_empty());
    }
}

//! Audit sinks.

use std::sync::Mutex;

use super::events::{AuditEvent, AuditEventType};

/// Destination for audit events. Recording is fire-and-forget: a sink never
/// reports failure back to the operation that produced the event.
pub trait AuditSink: Send + Sync {
    fn record_event(&self, event: &AuditEvent);
}

/// Writes each event as JSON on the `audit` tracing target.
///
/// Successful events are logged at INFO, failures at WARN.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record_event(&self, event: &AuditEvent) {
        let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());

        if event.success {
            tracing::event!(
                target: "audit",
                tracing::Level::INFO,
                audit_entry = %json,
                event_type = %event.event_type,
                severity = ?event.severity,
                actor_id = %event.actor_id,
                success = event.success,
                "Storage audit log"
            );
        } else {
            tracing::event!(
                target: "audit",
                tracing::Level::WARN,
                audit_entry = %json,
                event_type = %event.event_type,
                severity = ?event.severity,
                actor_id = %event.actor_id,
                success = event.success,
                reason = ?event.reason,
                "Storage audit log - failure"
            );
        }
    }
}

/// Keeps events in memory for inspection.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.lock().clone()
    }

    pub fn events_of_type(&self, event_type: AuditEventType) -> Vec<AuditEvent> {
        self.lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<AuditEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AuditSink for MemoryAuditSink {
    fn record_event(&self, event: &AuditEvent) {
        self.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects_events() {
        let sink = MemoryAuditSink::new();
        assert!(sink.is_empty());

        sink.record_event(&AuditEvent::new(AuditEventType::FileUploaded, "alice", "file"));
        sink.record_event(&AuditEvent::new(AuditEventType::StorageError, "alice", "storage"));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.events_of_type(AuditEventType::StorageError).len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_tracing_sink_does_not_panic_without_subscriber() {
        let sink = TracingAuditSink;
        sink.record_event(&AuditEvent::new(AuditEventType::FileDeleted, "bob", "file"));
        sink.record_event(
            &AuditEvent::new(AuditEventType::StorageError, "bob", "storage").with_failure("boom"),
        );
    }
}

//! In-memory audit sink for testing.
//!
//! Captures every envelope for assertions and can be switched into a failing
//! mode to exercise the emitter's error path.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::domain::audit::AuditEvent;
use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::AuditSink;

/// In-memory audit sink.
///
/// # Example
///
/// ```ignore
/// let sink = Arc::new(InMemoryAuditSink::new());
/// let (emitter, worker) = AuditEmitter::new(sink.clone(), AuditEmitterConfig::default());
///
/// // ... run invocations, flush the emitter ...
/// assert_eq!(sink.events_of_type("invocation_started").len(), 1);
/// ```
pub struct InMemoryAuditSink {
    emitted: RwLock<Vec<EventEnvelope>>,
    failing: AtomicBool,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self {
            emitted: RwLock::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent `emit` fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    // === Test Helpers ===

    /// Returns all captured envelopes in emission order.
    pub fn events(&self) -> Vec<EventEnvelope> {
        self.emitted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns captured envelopes decoded back into audit events.
    pub fn audit_events(&self) -> Vec<AuditEvent> {
        self.events()
            .iter()
            .filter_map(|e| e.payload_as::<AuditEvent>().ok())
            .collect()
    }

    /// Returns envelopes of a specific type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Returns envelopes that share a correlation id.
    pub fn events_for_correlation(&self, correlation_id: &str) -> Vec<EventEnvelope> {
        self.events()
            .into_iter()
            .filter(|e| e.correlation_id() == Some(correlation_id))
            .collect()
    }

    /// Returns envelopes emitted for one tool.
    pub fn events_for_tool(&self, tool_name: &str) -> Vec<EventEnvelope> {
        self.events()
            .into_iter()
            .filter(|e| e.aggregate_id == tool_name)
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.emitted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.emitted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| e.event_type == event_type)
    }

    /// Clears captured events (for test isolation).
    pub fn clear(&self) {
        self.emitted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for InMemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn emit(&self, event: EventEnvelope) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::AuditSinkUnavailable,
                "in-memory sink set to fail",
            ));
        }
        self.emitted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::SerializableDomainEvent;
    use crate::domain::invocation::CorrelationContext;
    use std::time::Duration;

    fn envelope(tool: &str, ctx: &CorrelationContext) -> EventEnvelope {
        AuditEvent::succeeded(tool, ctx, Duration::from_millis(5))
            .to_envelope()
            .unwrap()
    }

    #[tokio::test]
    async fn captures_and_filters_events() {
        let sink = InMemoryAuditSink::new();
        let ctx = CorrelationContext::new();
        sink.emit(envelope("blast", &ctx)).await.unwrap();
        sink.emit(envelope("uniprot", &CorrelationContext::new())).await.unwrap();

        assert_eq!(sink.event_count(), 2);
        assert!(sink.has_event("invocation_succeeded"));
        assert_eq!(sink.events_for_tool("blast").len(), 1);
        assert_eq!(sink.events_for_correlation(ctx.correlation_id.as_str()).len(), 1);
        assert_eq!(sink.audit_events()[0].tool_name, "blast");
    }

    #[tokio::test]
    async fn failing_mode_rejects_events() {
        let sink = InMemoryAuditSink::new();
        sink.set_failing(true);

        let err = sink.emit(envelope("blast", &CorrelationContext::new())).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AuditSinkUnavailable);
        assert_eq!(sink.event_count(), 0);
    }

    #[tokio::test]
    async fn clear_removes_events() {
        let sink = InMemoryAuditSink::new();
        sink.emit(envelope("blast", &CorrelationContext::new())).await.unwrap();
        sink.clear();
        assert_eq!(sink.event_count(), 0);
    }
}

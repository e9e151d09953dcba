//! Audit sink that writes events to the `audit` tracing target.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::AuditSink;

/// Logs each audit envelope as one structured `info` record.
///
/// Suitable when no external event store is wired in; pair with a JSON log
/// format to get machine-readable audit lines.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn emit(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let payload = serde_json::to_string(&event.payload)
            .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;
        tracing::info!(
            target: "audit",
            event_id = %event.event_id,
            event_type = %event.event_type,
            tool = %event.aggregate_id,
            correlation_id = event.correlation_id().unwrap_or("-"),
            occurred_at = %event.occurred_at.as_datetime().to_rfc3339(),
            payload = %payload,
            "audit event"
        );
        Ok(())
    }
}

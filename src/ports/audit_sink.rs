//! AuditSink port - external destination for audit events.
//!
//! The sink owns durability and later querying. The gateway hands events
//! over through the audit emitter and never reads them back.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for delivering audit events.
///
/// Errors are reported to the emitter, which logs them; they never reach
/// the caller of the gateway.
///
/// # Example
///
/// ```ignore
/// let envelope = AuditEvent::started(tool, &ctx, version, None).to_envelope()?;
/// sink.emit(envelope).await?;
/// ```
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Deliver a single event.
    async fn emit(&self, event: EventEnvelope) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn AuditSink) {}
}

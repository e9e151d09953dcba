//! Audit module - the append-only records emitted for every invocation.

mod event;

pub use event::{AuditEvent, AuditEventType, AuditPayload, CircuitCloseTrigger, FailureReason};

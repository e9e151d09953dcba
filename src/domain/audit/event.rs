//! AuditEvent and its payload variants.
//!
//! Five event types exist: `invocation_started`, `invocation_succeeded`,
//! `invocation_failed`, `circuit_opened` and `circuit_closed`. The event type
//! is derived from the payload so the two can never disagree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::domain::foundation::{DomainEvent, EventId, EventMetadata, Timestamp};
use crate::domain::invocation::{CorrelationContext, ErrorKind, InvocationError};

/// Kind of audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    InvocationStarted,
    InvocationSucceeded,
    InvocationFailed,
    CircuitOpened,
    CircuitClosed,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::InvocationStarted => "invocation_started",
            AuditEventType::InvocationSucceeded => "invocation_succeeded",
            AuditEventType::InvocationFailed => "invocation_failed",
            AuditEventType::CircuitOpened => "circuit_opened",
            AuditEventType::CircuitClosed => "circuit_closed",
        }
    }

    /// True for the two events that close an invocation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuditEventType::InvocationSucceeded | AuditEventType::InvocationFailed
        )
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why an invocation failed, as recorded in `invocation_failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Capacity,
    CircuitOpen,
    Execution,
    Timeout,
    Validation,
    Cancelled,
}

impl FailureReason {
    /// Maps an invocation error onto an audit reason.
    ///
    /// Unknown tools have no reason: they fail before anything is emitted.
    pub fn from_error(err: &InvocationError) -> Option<Self> {
        match err.kind() {
            ErrorKind::UnknownTool => None,
            ErrorKind::CapacityExceeded => Some(FailureReason::Capacity),
            ErrorKind::CircuitOpen => Some(FailureReason::CircuitOpen),
            ErrorKind::AdapterExecution => Some(FailureReason::Execution),
            ErrorKind::Timeout => Some(FailureReason::Timeout),
            ErrorKind::Validation => Some(FailureReason::Validation),
            ErrorKind::Cancelled => Some(FailureReason::Cancelled),
        }
    }
}

/// How a breaker came to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitCloseTrigger {
    ProbeSucceeded,
    OperatorReset,
}

/// Outcome-specific part of an audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditPayload {
    InvocationStarted {
        tool_version: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input_hash: Option<String>,
    },
    InvocationSucceeded {
        duration_ms: u64,
    },
    InvocationFailed {
        reason: FailureReason,
        error_kind: ErrorKind,
        message: String,
        duration_ms: u64,
    },
    CircuitOpened {
        consecutive_failures: u32,
        recovery_timeout_ms: u64,
    },
    CircuitClosed {
        trigger: CircuitCloseTrigger,
    },
}

impl AuditPayload {
    pub fn event_type(&self) -> AuditEventType {
        match self {
            AuditPayload::InvocationStarted { .. } => AuditEventType::InvocationStarted,
            AuditPayload::InvocationSucceeded { .. } => AuditEventType::InvocationSucceeded,
            AuditPayload::InvocationFailed { .. } => AuditEventType::InvocationFailed,
            AuditPayload::CircuitOpened { .. } => AuditEventType::CircuitOpened,
            AuditPayload::CircuitClosed { .. } => AuditEventType::CircuitClosed,
        }
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: EventId,
    pub tool_name: String,
    pub correlation: CorrelationContext,
    pub occurred_at: Timestamp,
    #[serde(flatten)]
    pub payload: AuditPayload,
}

impl AuditEvent {
    fn new(tool_name: &str, correlation: &CorrelationContext, payload: AuditPayload) -> Self {
        Self {
            event_id: EventId::new(),
            tool_name: tool_name.to_string(),
            correlation: correlation.clone(),
            occurred_at: Timestamp::now(),
            payload,
        }
    }

    pub fn started(
        tool_name: &str,
        correlation: &CorrelationContext,
        tool_version: &str,
        input_hash: Option<String>,
    ) -> Self {
        Self::new(
            tool_name,
            correlation,
            AuditPayload::InvocationStarted {
                tool_version: tool_version.to_string(),
                input_hash,
            },
        )
    }

    pub fn succeeded(tool_name: &str, correlation: &CorrelationContext, duration: Duration) -> Self {
        Self::new(
            tool_name,
            correlation,
            AuditPayload::InvocationSucceeded {
                duration_ms: duration.as_millis() as u64,
            },
        )
    }

    /// Builds `invocation_failed` for an error. Unknown-tool errors map to
    /// the execution reason, though the gateway never emits them.
    pub fn failed(
        tool_name: &str,
        correlation: &CorrelationContext,
        error: &InvocationError,
        duration: Duration,
    ) -> Self {
        Self::new(
            tool_name,
            correlation,
            AuditPayload::InvocationFailed {
                reason: FailureReason::from_error(error).unwrap_or(FailureReason::Execution),
                error_kind: error.kind(),
                message: error.to_string(),
                duration_ms: duration.as_millis() as u64,
            },
        )
    }

    pub fn circuit_opened(
        tool_name: &str,
        correlation: &CorrelationContext,
        consecutive_failures: u32,
        recovery_timeout: Duration,
    ) -> Self {
        Self::new(
            tool_name,
            correlation,
            AuditPayload::CircuitOpened {
                consecutive_failures,
                recovery_timeout_ms: recovery_timeout.as_millis() as u64,
            },
        )
    }

    pub fn circuit_closed(
        tool_name: &str,
        correlation: &CorrelationContext,
        trigger: CircuitCloseTrigger,
    ) -> Self {
        Self::new(tool_name, correlation, AuditPayload::CircuitClosed { trigger })
    }

    pub fn event_type(&self) -> AuditEventType {
        self.payload.event_type()
    }

    pub fn correlation_id(&self) -> &str {
        self.correlation.correlation_id.as_str()
    }

    /// Failure reason, for `invocation_failed` records.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match &self.payload {
            AuditPayload::InvocationFailed { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

impl DomainEvent for AuditEvent {
    fn event_type(&self) -> &'static str {
        self.payload.event_type().as_str()
    }

    fn aggregate_id(&self) -> String {
        self.tool_name.clone()
    }

    fn aggregate_type(&self) -> &'static str {
        "Tool"
    }

    fn occurred_at(&self) -> Timestamp {
        self.occurred_at
    }

    fn event_id(&self) -> EventId {
        self.event_id.clone()
    }

    fn metadata(&self) -> EventMetadata {
        self.correlation.to_metadata()
    }
}

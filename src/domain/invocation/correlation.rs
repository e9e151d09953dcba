//! CorrelationContext - identity threaded through one external request.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CorrelationId, EventMetadata, SessionId, UserId};

/// Correlation identity attached to every audit event of a request.
///
/// Created once at the system boundary and never mutated afterwards; the
/// gateway only copies it onto events and results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationContext {
    pub correlation_id: CorrelationId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl CorrelationContext {
    /// Creates a context with a freshly generated correlation id.
    pub fn new() -> Self {
        Self::with_id(CorrelationId::new())
    }

    /// Creates a context around a correlation id received from the caller.
    pub fn with_id(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            user_id: None,
            session_id: None,
            trace_id: None,
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_trace(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Projects the context onto event envelope metadata.
    pub fn to_metadata(&self) -> EventMetadata {
        EventMetadata {
            correlation_id: Some(self.correlation_id.to_string()),
            user_id: self.user_id.as_ref().map(|u| u.to_string()),
            session_id: self.session_id.as_ref().map(|s| s.to_string()),
            trace_id: self.trace_id.clone(),
        }
    }
}

impl Default for CorrelationContext {
    fn default() -> Self {
        Self::new()
    }
}

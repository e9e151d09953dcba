//! InvocationResult - the uniform envelope returned for every request.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::{CorrelationContext, ErrorKind, InvocationError};

/// Payload or structured error of a finished invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationOutcome {
    Payload(Value),
    Error(InvocationError),
}

/// Result envelope produced exactly once per [`InvocationRequest`](super::InvocationRequest).
#[derive(Debug, Clone, Serialize)]
pub struct InvocationResult {
    pub success: bool,
    pub tool_name: String,
    pub outcome: InvocationOutcome,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
    /// Version of the tool that ran; absent when the tool was never resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
    pub correlation: CorrelationContext,
}

impl InvocationResult {
    pub fn succeeded(
        tool_name: impl Into<String>,
        payload: Value,
        duration: Duration,
        tool_version: impl Into<String>,
        correlation: CorrelationContext,
    ) -> Self {
        Self {
            success: true,
            tool_name: tool_name.into(),
            outcome: InvocationOutcome::Payload(payload),
            duration,
            tool_version: Some(tool_version.into()),
            correlation,
        }
    }

    pub fn failed(
        error: InvocationError,
        duration: Duration,
        tool_version: Option<String>,
        correlation: CorrelationContext,
    ) -> Self {
        Self {
            success: false,
            tool_name: error.tool().to_string(),
            outcome: InvocationOutcome::Error(error),
            duration,
            tool_version,
            correlation,
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match &self.outcome {
            InvocationOutcome::Payload(value) => Some(value),
            InvocationOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&InvocationError> {
        match &self.outcome {
            InvocationOutcome::Payload(_) => None,
            InvocationOutcome::Error(err) => Some(err),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(InvocationError::kind)
    }

    /// Converts the envelope into a plain `Result`.
    pub fn into_result(self) -> Result<Value, InvocationError> {
        match self.outcome {
            InvocationOutcome::Payload(value) => Ok(value),
            InvocationOutcome::Error(err) => Err(err),
        }
    }
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

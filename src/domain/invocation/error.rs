//! Typed failure taxonomy for tool invocations.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Which ceiling rejected a capacity request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityScope {
    Global,
    Tool,
}

impl fmt::Display for CapacityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityScope::Global => write!(f, "global"),
            CapacityScope::Tool => write!(f, "per-tool"),
        }
    }
}

/// Errors returned from a gateway invocation.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvocationError {
    #[error("Unknown tool: {tool}")]
    UnknownTool { tool: String },

    #[error("Capacity exceeded for {tool} ({scope} ceiling)")]
    CapacityExceeded { tool: String, scope: CapacityScope },

    #[error("Circuit open for {tool}, retry after {retry_after_ms}ms")]
    CircuitOpen { tool: String, retry_after_ms: u64 },

    #[error("Tool {tool} failed: {message}")]
    AdapterExecution { tool: String, message: String },

    #[error("Tool {tool} timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },

    #[error("Invalid parameters for {tool}: {error}")]
    Validation { tool: String, error: ValidationError },

    #[error("Invocation of {tool} was cancelled")]
    Cancelled { tool: String },
}

/// Error classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownTool,
    CapacityExceeded,
    CircuitOpen,
    AdapterExecution,
    Timeout,
    Validation,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownTool => "unknown_tool",
            ErrorKind::CapacityExceeded => "capacity_exceeded",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::AdapterExecution => "adapter_execution",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Validation => "validation",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl InvocationError {
    pub fn unknown_tool(tool: impl Into<String>) -> Self {
        InvocationError::UnknownTool { tool: tool.into() }
    }

    pub fn execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        InvocationError::AdapterExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn timeout(tool: impl Into<String>, after: std::time::Duration) -> Self {
        InvocationError::Timeout {
            tool: tool.into(),
            timeout_ms: after.as_millis() as u64,
        }
    }

    pub fn validation(tool: impl Into<String>, error: ValidationError) -> Self {
        InvocationError::Validation {
            tool: tool.into(),
            error,
        }
    }

    pub fn cancelled(tool: impl Into<String>) -> Self {
        InvocationError::Cancelled { tool: tool.into() }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvocationError::UnknownTool { .. } => ErrorKind::UnknownTool,
            InvocationError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            InvocationError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            InvocationError::AdapterExecution { .. } => ErrorKind::AdapterExecution,
            InvocationError::Timeout { .. } => ErrorKind::Timeout,
            InvocationError::Validation { .. } => ErrorKind::Validation,
            InvocationError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Name of the tool the error concerns.
    pub fn tool(&self) -> &str {
        match self {
            InvocationError::UnknownTool { tool }
            | InvocationError::CapacityExceeded { tool, .. }
            | InvocationError::CircuitOpen { tool, .. }
            | InvocationError::AdapterExecution { tool, .. }
            | InvocationError::Timeout { tool, .. }
            | InvocationError::Validation { tool, .. }
            | InvocationError::Cancelled { tool } => tool,
        }
    }

    /// Check if the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InvocationError::CapacityExceeded { .. }
                | InvocationError::CircuitOpen { .. }
                | InvocationError::AdapterExecution { .. }
                | InvocationError::Timeout { .. }
        )
    }

    /// Only execution failures feed the tool's circuit breaker.
    pub fn counts_toward_breaker(&self) -> bool {
        matches!(
            self,
            InvocationError::AdapterExecution { .. } | InvocationError::Timeout { .. }
        )
    }
}

impl From<InvocationError> for DomainError {
    fn from(err: InvocationError) -> Self {
        let code = match err.kind() {
            ErrorKind::UnknownTool => ErrorCode::ToolNotFound,
            ErrorKind::CapacityExceeded => ErrorCode::CapacityExceeded,
            ErrorKind::CircuitOpen => ErrorCode::CircuitOpen,
            ErrorKind::AdapterExecution => ErrorCode::ToolExecutionFailed,
            ErrorKind::Timeout => ErrorCode::Timeout,
            ErrorKind::Validation => ErrorCode::ValidationFailed,
            ErrorKind::Cancelled => ErrorCode::Cancelled,
        };
        DomainError::new(code, err.to_string()).with_detail("tool", err.tool())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn only_execution_failures_count_toward_breaker() {
        assert!(InvocationError::execution("t", "boom").counts_toward_breaker());
        assert!(InvocationError::timeout("t", Duration::from_secs(1)).counts_toward_breaker());
        assert!(!InvocationError::validation("t", ValidationError::missing_field("x"))
            .counts_toward_breaker());
        assert!(!InvocationError::cancelled("t").counts_toward_breaker());
        assert!(!InvocationError::unknown_tool("t").counts_toward_breaker());
    }

    #[test]
    fn retryability_follows_error_kind() {
        assert!(InvocationError::CapacityExceeded {
            tool: "t".into(),
            scope: CapacityScope::Global
        }
        .is_retryable());
        assert!(!InvocationError::unknown_tool("t").is_retryable());
        assert!(!InvocationError::validation("t", ValidationError::empty_field("x")).is_retryable());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let err = InvocationError::CircuitOpen {
            tool: "blast_search".into(),
            retry_after_ms: 1500,
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "circuit_open");
        assert_eq!(json["retry_after_ms"], 1500);
        assert_eq!(err.kind().to_string(), "circuit_open");
    }

    #[test]
    fn converts_to_domain_error_code() {
        let err: DomainError = InvocationError::unknown_tool("nope").into();
        assert_eq!(err.code, ErrorCode::ToolNotFound);
        assert_eq!(err.details.get("tool"), Some(&"nope".to_string()));
    }
}

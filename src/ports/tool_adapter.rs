//! ToolAdapter port - uniform async interface over a concrete tool.
//!
//! The gateway treats every tool as an opaque async operation. Adapters must
//! return at or before the deadline in [`InvocationContext`] and should stop
//! work early when its cancellation token fires.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::domain::foundation::ValidationError;
use crate::domain::invocation::{CorrelationContext, Parameters};

/// Port implemented once per concrete tool.
///
/// # Example
///
/// ```ignore
/// #[async_trait]
/// impl ToolAdapter for BlastAdapter {
///     async fn invoke(&self, params: &Parameters, ctx: &InvocationContext)
///         -> Result<Value, AdapterError>
///     {
///         tokio::select! {
///             _ = ctx.cancel.cancelled() => Err(AdapterError::Execution("cancelled".into())),
///             hits = self.client.search(params) => hits.map_err(AdapterError::from),
///         }
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Runs the tool.
    async fn invoke(
        &self,
        params: &Parameters,
        ctx: &InvocationContext,
    ) -> Result<Value, AdapterError>;

    /// Reports whether the tool can currently serve requests.
    async fn health_check(&self) -> HealthStatus;

    /// Expected run time for these parameters.
    fn estimated_cost(&self, params: &Parameters) -> Duration;
}

/// Per-call context handed to an adapter.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub correlation: CorrelationContext,
    /// Time budget the adapter was given.
    pub timeout: Duration,
    pub deadline: Instant,
    pub cancel: CancellationToken,
}

impl InvocationContext {
    pub fn new(correlation: CorrelationContext, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            correlation,
            timeout,
            deadline: Instant::now() + timeout,
            cancel,
        }
    }

    /// Budget left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Health report of one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub detail: String,
}

impl HealthStatus {
    pub fn healthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: true,
            detail: detail.into(),
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: false,
            detail: detail.into(),
        }
    }
}

/// Errors an adapter may return.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    /// The tool ran and failed.
    #[error("execution failed: {0}")]
    Execution(String),

    /// The tool did not finish in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The tool rejected its inputs.
    #[error("invalid parameters: {0}")]
    InvalidParameters(#[from] ValidationError),

    /// The backing service could not be reached.
    #[error("tool unavailable: {0}")]
    Unavailable(String),
}

impl AdapterError {
    /// Check if this error describes the tool's health rather than the input.
    pub fn is_execution_failure(&self) -> bool {
        !matches!(self, AdapterError::InvalidParameters(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn ToolAdapter) {}

    #[test]
    fn invalid_parameters_are_not_execution_failures() {
        let err: AdapterError = ValidationError::missing_field("sequence").into();
        assert!(!err.is_execution_failure());
        assert!(AdapterError::Unavailable("down".into()).is_execution_failure());
        assert!(AdapterError::Timeout(Duration::from_secs(1)).is_execution_failure());
    }

    #[tokio::test(start_paused = true)]
    async fn context_tracks_remaining_budget() {
        let ctx = InvocationContext::new(
            CorrelationContext::new(),
            Duration::from_secs(10),
            CancellationToken::new(),
        );
        tokio::time::advance(Duration::from_secs(4)).await;

        assert_eq!(ctx.remaining(), Duration::from_secs(6));
        assert!(!ctx.is_cancelled());
    }
}

//! CircuitBreaker port - per-tool failure isolation.
//!
//! Each registered tool gets its own breaker. The gateway asks for a
//! [`CallPermit`] before running the tool and reports the outcome with that
//! permit afterwards, so the single half-open probe is tracked explicitly.
//!
//! ## Transitions
//!
//! ```text
//! Closed --[failure_threshold consecutive failures]--> Open
//! Open --[recovery_timeout elapsed]--> HalfOpen (one probe admitted)
//! HalfOpen --[probe succeeds]--> Closed
//! HalfOpen --[probe fails]--> Open
//! ```

use std::sync::Arc;

pub use crate::domain::resilience::{
    CallPermit, CircuitBreakerConfig, CircuitOpen, CircuitSnapshot, CircuitState,
    CircuitTransition,
};

/// Port for circuit breaker functionality.
///
/// Implementations hold their lock only for the state check or update,
/// never across the tool call.
///
/// # Example
///
/// ```ignore
/// let (permit, _) = breaker.try_acquire()?;
/// match adapter.invoke(&params, &ctx).await {
///     Ok(value) => { breaker.record_success(permit); Ok(value) }
///     Err(e) => { breaker.record_failure(permit); Err(e) }
/// }
/// ```
pub trait CircuitBreaker: Send + Sync {
    /// Get the current state of the circuit.
    fn state(&self) -> CircuitState;

    /// Ask to run one call.
    ///
    /// Returns the permit plus the transition the admission caused (an open
    /// breaker past its recovery timeout moves to half-open here).
    fn try_acquire(&self) -> Result<(CallPermit, Option<CircuitTransition>), CircuitOpen>;

    /// Record a successful call.
    fn record_success(&self, permit: CallPermit) -> Option<CircuitTransition>;

    /// Record an execution failure (tool error or timeout).
    fn record_failure(&self, permit: CallPermit) -> Option<CircuitTransition>;

    /// Return a permit whose call says nothing about tool health.
    fn release_neutral(&self, permit: CallPermit);

    /// Force the circuit closed.
    ///
    /// Use sparingly - typically for administrative intervention.
    fn reset(&self) -> Option<CircuitTransition>;

    /// Get metrics about the circuit breaker.
    fn metrics(&self) -> CircuitSnapshot;
}

/// Creates the breaker guarding a newly registered tool.
pub trait CircuitBreakerFactory: Send + Sync {
    fn create(&self, tool_name: &str) -> Arc<dyn CircuitBreaker>;
}

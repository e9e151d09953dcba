//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the gateway core and the outside world. Adapters implement these ports.
//!
//! - `ToolAdapter` - Uniform async interface over one concrete tool
//! - `CircuitBreaker` - Per-tool failure isolation
//! - `CapacityLimiter` - Global and per-tool concurrency ceilings
//! - `AuditSink` - External destination for audit events

mod audit_sink;
mod capacity_limiter;
mod circuit_breaker;
mod tool_adapter;

pub use audit_sink::AuditSink;
pub use capacity_limiter::{
    AcquirePolicy, CapacityError, CapacityLease, CapacityLimiter, CapacitySnapshot, CapacityToken,
    CeilingUsage,
};
pub use circuit_breaker::{
    CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerFactory, CircuitOpen,
    CircuitSnapshot, CircuitState, CircuitTransition,
};
pub use tool_adapter::{AdapterError, HealthStatus, InvocationContext, ToolAdapter};

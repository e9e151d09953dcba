//! Resilience module - the per-tool circuit breaker state machine.

mod circuit;

pub use circuit::{
    CallPermit, CircuitBreakerConfig, CircuitOpen, CircuitSnapshot, CircuitState,
    CircuitStateMachine, CircuitTransition,
};

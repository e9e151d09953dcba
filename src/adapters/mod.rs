//! Adapters - Implementations of port interfaces.
//!
//! - `capacity` - Semaphore-backed capacity limiter
//! - `events` - Audit sinks (in-memory, tracing)
//! - `resilience` - In-process circuit breakers
//! - `tools` - Tool adapters (local sequence features, mock)

pub mod capacity;
pub mod events;
pub mod resilience;
pub mod tools;

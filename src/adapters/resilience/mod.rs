//! Circuit breaker adapters.

mod in_memory;

pub use in_memory::{InMemoryCircuitBreaker, InMemoryCircuitBreakerFactory};

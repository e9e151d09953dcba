//! Capacity limiter adapters.

mod semaphore;

pub use semaphore::{CapacityCeilings, SemaphoreCapacityLimiter};

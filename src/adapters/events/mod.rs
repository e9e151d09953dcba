//! Audit sink adapters.
//!
//! - `InMemoryAuditSink` - Captures events in process, for tests
//! - `TracingAuditSink` - Writes events to the `audit` log target

mod in_memory;
mod tracing_sink;

pub use in_memory::InMemoryAuditSink;
pub use tracing_sink::TracingAuditSink;

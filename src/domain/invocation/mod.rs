//! Invocation module - requests, results and the failure taxonomy.

mod correlation;
mod error;
mod request;
mod result;

pub use correlation::CorrelationContext;
pub use error::{CapacityScope, ErrorKind, InvocationError};
pub use request::{InvocationRequest, Parameters};
pub use result::{InvocationOutcome, InvocationResult};

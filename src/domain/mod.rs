//! Domain layer containing the gateway's types and pure rules.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (identifiers, timestamps, events, errors)
//! - `tool` - Tool descriptors, capability tags and declarative schemas
//! - `invocation` - Requests, results and the failure taxonomy
//! - `audit` - Append-only audit records
//! - `resilience` - Circuit breaker state machine
//! - `recommendation` - Query shape, scoring and ranking
//! - `sequence` - Molecule classification for sequence strings

pub mod audit;
pub mod foundation;
pub mod invocation;
pub mod recommendation;
pub mod resilience;
pub mod sequence;
pub mod tool;

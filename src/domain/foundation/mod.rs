//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, event transport types and error
//! types that form the vocabulary of the tool gateway.

mod errors;
mod events;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent};
pub use ids::{CorrelationId, SessionId, UserId};
pub use timestamp::Timestamp;

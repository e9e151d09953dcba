//! Tool module - descriptors, capability tags and declarative schemas.

mod capability;
mod descriptor;
mod schema;

pub use capability::{CapabilitySet, ToolCapability};
pub use descriptor::{ToolDescriptor, ToolDescriptorBuilder};
pub use schema::{FieldKind, SchemaField, ToolSchema};

//! ToolDescriptor - immutable metadata for one registered tool.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::{CapabilitySet, ToolCapability, ToolSchema};
use crate::domain::foundation::ValidationError;

/// Catalog entry describing a tool's identity, capabilities and contract.
///
/// Built through [`ToolDescriptorBuilder`]; never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    name: String,
    display_name: String,
    description: String,
    capabilities: CapabilitySet,
    input_schema: ToolSchema,
    output_schema: ToolSchema,
    #[serde(with = "duration_millis")]
    estimated_duration: Duration,
    version: String,
    requires_auth: bool,
}

impl ToolDescriptor {
    /// Starts a builder for a tool with the given unique name.
    pub fn builder(name: impl Into<String>) -> ToolDescriptorBuilder {
        ToolDescriptorBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn input_schema(&self) -> &ToolSchema {
        &self.input_schema
    }

    pub fn output_schema(&self) -> &ToolSchema {
        &self.output_schema
    }

    pub fn estimated_duration(&self) -> Duration {
        self.estimated_duration
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    /// True if the tool declares the capability.
    pub fn has_capability(&self, capability: ToolCapability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Caller-facing description with rendered JSON schemas.
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "display_name": self.display_name,
            "description": self.description,
            "version": self.version,
            "capabilities": self.capabilities,
            "input_schema": self.input_schema.to_json_schema(),
            "output_schema": self.output_schema.to_json_schema(),
            "estimated_duration_ms": self.estimated_duration.as_millis() as u64,
            "requires_auth": self.requires_auth,
        })
    }
}

/// Builder for [`ToolDescriptor`].
#[derive(Debug, Clone)]
pub struct ToolDescriptorBuilder {
    name: String,
    display_name: Option<String>,
    description: String,
    capabilities: CapabilitySet,
    input_schema: ToolSchema,
    output_schema: ToolSchema,
    estimated_duration: Duration,
    version: String,
    requires_auth: bool,
}

impl ToolDescriptorBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            description: String::new(),
            capabilities: CapabilitySet::new(),
            input_schema: ToolSchema::new(),
            output_schema: ToolSchema::new(),
            estimated_duration: Duration::from_secs(1),
            version: "1.0.0".to_string(),
            requires_auth: false,
        }
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn capability(mut self, capability: ToolCapability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = ToolCapability>) -> Self {
        for capability in capabilities {
            self.capabilities.insert(capability);
        }
        self
    }

    pub fn input_schema(mut self, schema: ToolSchema) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn output_schema(mut self, schema: ToolSchema) -> Self {
        self.output_schema = schema;
        self
    }

    pub fn estimated_duration(mut self, duration: Duration) -> Self {
        self.estimated_duration = duration;
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    /// Validates and builds the descriptor.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the name or version is blank
    /// - `InvalidFormat` if the name contains characters other than
    ///   lowercase ASCII letters, digits, `_`, `-` or `.`
    pub fn build(self) -> Result<ToolDescriptor, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.'))
        {
            return Err(ValidationError::invalid_format(
                "name",
                "use lowercase letters, digits, '_', '-' or '.'",
            ));
        }
        if self.version.trim().is_empty() {
            return Err(ValidationError::empty_field("version"));
        }

        Ok(ToolDescriptor {
            display_name: self.display_name.unwrap_or_else(|| name.clone()),
            name,
            description: self.description,
            capabilities: self.capabilities,
            input_schema: self.input_schema,
            output_schema: self.output_schema,
            estimated_duration: self.estimated_duration,
            version: self.version,
            requires_auth: self.requires_auth,
        })
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

//! Audit emission configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::application::AuditEmitterConfig;

/// Audit emitter settings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AuditConfig {
    /// Events buffered before new ones are dropped
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Attach a SHA-256 digest of the parameters to `invocation_started`
    #[serde(default = "default_include_input_hash")]
    pub include_input_hash: bool,
}

impl AuditConfig {
    pub fn emitter_config(&self) -> AuditEmitterConfig {
        AuditEmitterConfig {
            channel_capacity: self.channel_capacity,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.channel_capacity == 0 {
            return Err(ValidationError::MustBePositive("audit.channel_capacity"));
        }
        Ok(())
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            include_input_hash: default_include_input_hash(),
        }
    }
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_include_input_hash() -> bool {
    true
}

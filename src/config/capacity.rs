//! Capacity ceiling configuration

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::capacity::CapacityCeilings;
use crate::ports::AcquirePolicy;

/// Behaviour when a ceiling is saturated
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AcquireMode {
    FailFast,
    #[default]
    Wait,
}

/// Concurrency ceilings and acquisition policy
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CapacityConfig {
    /// Invocations running at once across all tools
    #[serde(default = "default_global_max")]
    pub global_max: usize,

    /// Invocations running at once for any single tool
    #[serde(default = "default_per_tool_max")]
    pub per_tool_max: usize,

    /// Per-tool ceilings keyed by tool name
    #[serde(default)]
    pub overrides: HashMap<String, usize>,

    #[serde(default)]
    pub acquire_policy: AcquireMode,

    /// Longest wait for a slot under the `wait` policy
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_ms: u64,
}

impl CapacityConfig {
    pub fn ceilings(&self) -> CapacityCeilings {
        self.overrides.iter().fold(
            CapacityCeilings::new(self.global_max, self.per_tool_max),
            |ceilings, (tool, max)| ceilings.with_override(tool.clone(), *max),
        )
    }

    pub fn acquire_policy(&self) -> AcquirePolicy {
        match self.acquire_policy {
            AcquireMode::FailFast => AcquirePolicy::FailFast,
            AcquireMode::Wait => AcquirePolicy::Wait {
                timeout: Duration::from_millis(self.acquire_timeout_ms),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.global_max == 0 {
            return Err(ValidationError::MustBePositive("capacity.global_max"));
        }
        if self.per_tool_max == 0 {
            return Err(ValidationError::MustBePositive("capacity.per_tool_max"));
        }
        if self.per_tool_max > self.global_max {
            return Err(ValidationError::PerToolCeilingExceedsGlobal);
        }
        if let Some((tool, _)) = self
            .overrides
            .iter()
            .find(|(_, max)| **max == 0 || **max > self.global_max)
        {
            return Err(ValidationError::InvalidToolOverride(tool.clone()));
        }
        if self.acquire_policy == AcquireMode::Wait && self.acquire_timeout_ms == 0 {
            return Err(ValidationError::MustBePositive("capacity.acquire_timeout_ms"));
        }
        Ok(())
    }
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            global_max: default_global_max(),
            per_tool_max: default_per_tool_max(),
            overrides: HashMap::new(),
            acquire_policy: AcquireMode::default(),
            acquire_timeout_ms: default_acquire_timeout(),
        }
    }
}

fn default_global_max() -> usize {
    16
}

fn default_per_tool_max() -> usize {
    4
}

fn default_acquire_timeout() -> u64 {
    5000
}

//! Circuit breaker configuration

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::resilience::InMemoryCircuitBreakerFactory;
use crate::domain::resilience::CircuitBreakerConfig;

/// Breaker thresholds, with optional per-tool overrides
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BreakerConfig {
    /// Consecutive execution failures before a breaker opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds a breaker stays open before admitting a probe
    #[serde(default = "default_recovery_timeout")]
    pub recovery_timeout_secs: u64,

    /// Keyed by tool name
    #[serde(default)]
    pub overrides: HashMap<String, BreakerOverride>,
}

/// Per-tool replacement for either threshold
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct BreakerOverride {
    pub failure_threshold: Option<u32>,
    pub recovery_timeout_secs: Option<u64>,
}

impl BreakerConfig {
    /// Breaker settings for tools without an override
    pub fn defaults(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new(
            self.failure_threshold,
            Duration::from_secs(self.recovery_timeout_secs),
        )
    }

    /// Builds the factory the gateway uses to create one breaker per tool
    pub fn factory(&self) -> InMemoryCircuitBreakerFactory {
        self.overrides.iter().fold(
            InMemoryCircuitBreakerFactory::new(self.defaults()),
            |factory, (tool, o)| {
                factory.with_override(
                    tool.clone(),
                    CircuitBreakerConfig::new(
                        o.failure_threshold.unwrap_or(self.failure_threshold),
                        Duration::from_secs(
                            o.recovery_timeout_secs.unwrap_or(self.recovery_timeout_secs),
                        ),
                    ),
                )
            },
        )
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.failure_threshold == 0 {
            return Err(ValidationError::MustBePositive("breaker.failure_threshold"));
        }
        if self.recovery_timeout_secs == 0 {
            return Err(ValidationError::MustBePositive("breaker.recovery_timeout_secs"));
        }
        for (tool, o) in &self.overrides {
            if o.failure_threshold == Some(0) || o.recovery_timeout_secs == Some(0) {
                return Err(ValidationError::InvalidToolOverride(tool.clone()));
            }
        }
        Ok(())
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout(),
            overrides: HashMap::new(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_falls_back_to_defaults_per_field() {
        let mut config = BreakerConfig::default();
        config.overrides.insert(
            "seq_features".to_string(),
            BreakerOverride {
                failure_threshold: Some(3),
                recovery_timeout_secs: None,
            },
        );

        let factory = config.factory();
        let overridden = factory.config_for("seq_features");
        assert_eq!(overridden.failure_threshold, 3);
        assert_eq!(overridden.recovery_timeout, Duration::from_secs(30));
        assert_eq!(factory.config_for("blast_search").failure_threshold, 5);
    }

    #[test]
    fn rejects_zero_threshold() {
        let config = BreakerConfig {
            failure_threshold: 0,
            ..BreakerConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MustBePositive("breaker.failure_threshold"))
        );
    }

    #[test]
    fn rejects_zero_override() {
        let mut config = BreakerConfig::default();
        config.overrides.insert(
            "blast_search".to_string(),
            BreakerOverride {
                failure_threshold: None,
                recovery_timeout_secs: Some(0),
            },
        );
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidToolOverride(tool)) if tool == "blast_search"
        ));
    }
}

//! Invocation timeout configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Timeouts applied by the gateway
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InvocationConfig {
    /// Used when a request carries no timeout
    #[serde(default = "default_timeout")]
    pub default_timeout_secs: u64,

    /// Upper bound on any requested timeout
    #[serde(default = "default_max_timeout")]
    pub max_timeout_secs: u64,

    /// Bound on each adapter's health check
    #[serde(default = "default_health_check_timeout")]
    pub health_check_timeout_ms: u64,
}

impl InvocationConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn max_timeout(&self) -> Duration {
        Duration::from_secs(self.max_timeout_secs)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_timeout_secs == 0 {
            return Err(ValidationError::MustBePositive("invocation.default_timeout_secs"));
        }
        if self.max_timeout_secs == 0 {
            return Err(ValidationError::MustBePositive("invocation.max_timeout_secs"));
        }
        if self.health_check_timeout_ms == 0 {
            return Err(ValidationError::MustBePositive("invocation.health_check_timeout_ms"));
        }
        if self.default_timeout_secs > self.max_timeout_secs {
            return Err(ValidationError::DefaultTimeoutExceedsMax);
        }
        Ok(())
    }
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout(),
            max_timeout_secs: default_max_timeout(),
            health_check_timeout_ms: default_health_check_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_timeout() -> u64 {
    300
}

fn default_health_check_timeout() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = InvocationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_timeout(), Duration::from_secs(30));
        assert_eq!(config.health_check_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn default_above_max_is_rejected() {
        let config = InvocationConfig {
            default_timeout_secs: 600,
            ..InvocationConfig::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::DefaultTimeoutExceedsMax));
    }
}

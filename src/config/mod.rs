//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `TOOL_GATEWAY` prefix and nested values use double underscores as separators.
//! Every value has a default, so an empty environment yields a usable config.
//!
//! # Example
//!
//! ```no_run
//! use tool_gateway::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Global capacity: {}", config.capacity.global_max);
//! ```

mod audit;
mod breaker;
mod capacity;
mod error;
mod invocation;
mod recommendation;
mod telemetry;

pub use audit::AuditConfig;
pub use breaker::{BreakerConfig, BreakerOverride};
pub use capacity::{AcquireMode, CapacityConfig};
pub use error::{ConfigError, ValidationError};
pub use invocation::InvocationConfig;
pub use recommendation::RecommendationConfig;
pub use telemetry::{LogFormat, TelemetryConfig};

use serde::Deserialize;

use crate::application::GatewayConfig;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Log level and output format
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Circuit breaker thresholds
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// Concurrency ceilings and acquisition policy
    #[serde(default)]
    pub capacity: CapacityConfig,

    /// Invocation and health-check timeouts
    #[serde(default)]
    pub invocation: InvocationConfig,

    /// Recommendation scoring weights
    #[serde(default)]
    pub recommendation: RecommendationConfig,

    /// Audit emission
    #[serde(default)]
    pub audit: AuditConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `TOOL_GATEWAY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `TOOL_GATEWAY__BREAKER__FAILURE_THRESHOLD=3` -> `breaker.failure_threshold = 3`
    /// - `TOOL_GATEWAY__CAPACITY__OVERRIDES__HARDWARE_ARM=1` -> `capacity.overrides["hardware_arm"] = 1`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TOOL_GATEWAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for zero thresholds, ceilings or timeouts,
    /// weights outside [0, 1], and a per-tool ceiling above the global one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.breaker.validate()?;
        self.capacity.validate()?;
        self.invocation.validate()?;
        self.recommendation.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Gateway settings assembled from the invocation, capacity,
    /// recommendation and audit sections.
    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            default_timeout: self.invocation.default_timeout(),
            max_timeout: self.invocation.max_timeout(),
            acquire_policy: self.capacity.acquire_policy(),
            health_check_timeout: self.invocation.health_check_timeout(),
            include_input_hash: self.audit.include_input_hash,
            scoring: self.recommendation.weights(),
            metrics_window: self.recommendation.latency_window,
        }
    }
}

//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),

    #[error("{0} must be between 0 and 1")]
    WeightOutOfRange(&'static str),

    #[error("Per-tool capacity ceiling exceeds the global ceiling")]
    PerToolCeilingExceedsGlobal,

    #[error("Invalid override for tool '{0}'")]
    InvalidToolOverride(String),

    #[error("Default invocation timeout exceeds the maximum timeout")]
    DefaultTimeoutExceedsMax,
}

//! Recommendation scoring configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::recommendation::ScoringWeights;

/// Weights of the applicability score
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RecommendationConfig {
    #[serde(default = "default_capability_weight")]
    pub capability_weight: f64,

    #[serde(default = "default_schema_weight")]
    pub schema_weight: f64,

    /// Multiplier for tools whose breaker is open
    #[serde(default = "default_open_circuit_penalty")]
    pub open_circuit_penalty: f64,

    #[serde(default = "default_success_rate_threshold")]
    pub success_rate_threshold: f64,

    #[serde(default = "default_success_bonus")]
    pub success_bonus: f64,

    /// Executions needed before the success rate earns a bonus
    #[serde(default = "default_min_samples")]
    pub min_samples: u64,

    /// Latency samples kept per tool
    #[serde(default = "default_latency_window")]
    pub latency_window: usize,
}

impl RecommendationConfig {
    pub fn weights(&self) -> ScoringWeights {
        ScoringWeights {
            capability: self.capability_weight,
            schema: self.schema_weight,
            open_circuit_penalty: self.open_circuit_penalty,
            success_rate_threshold: self.success_rate_threshold,
            success_bonus: self.success_bonus,
            min_samples: self.min_samples,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let unit = [
            ("recommendation.capability_weight", self.capability_weight),
            ("recommendation.schema_weight", self.schema_weight),
            ("recommendation.open_circuit_penalty", self.open_circuit_penalty),
            ("recommendation.success_rate_threshold", self.success_rate_threshold),
            ("recommendation.success_bonus", self.success_bonus),
        ];
        if let Some((name, _)) = unit.iter().find(|(_, v)| !(0.0..=1.0).contains(v)) {
            return Err(ValidationError::WeightOutOfRange(*name));
        }
        if self.latency_window == 0 {
            return Err(ValidationError::MustBePositive("recommendation.latency_window"));
        }
        Ok(())
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        let weights = ScoringWeights::default();
        Self {
            capability_weight: weights.capability,
            schema_weight: weights.schema,
            open_circuit_penalty: weights.open_circuit_penalty,
            success_rate_threshold: weights.success_rate_threshold,
            success_bonus: weights.success_bonus,
            min_samples: weights.min_samples,
            latency_window: default_latency_window(),
        }
    }
}

fn default_capability_weight() -> f64 {
    ScoringWeights::default().capability
}

fn default_schema_weight() -> f64 {
    ScoringWeights::default().schema
}

fn default_open_circuit_penalty() -> f64 {
    ScoringWeights::default().open_circuit_penalty
}

fn default_success_rate_threshold() -> f64 {
    ScoringWeights::default().success_rate_threshold
}

fn default_success_bonus() -> f64 {
    ScoringWeights::default().success_bonus
}

fn default_min_samples() -> u64 {
    ScoringWeights::default().min_samples
}

fn default_latency_window() -> usize {
    100
}

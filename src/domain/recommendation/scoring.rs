//! Applicability scoring and ranking.
//!
//! score = capability_weight * overlap + schema_weight * schema_match,
//! multiplied by the open-circuit penalty when the tool's breaker is open,
//! plus a bonus for a proven success rate, clamped to [0, 1].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use super::RecommendationQuery;
use crate::domain::resilience::CircuitState;
use crate::domain::tool::ToolDescriptor;

/// Tunable weights for the applicability score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub capability: f64,
    pub schema: f64,
    /// Multiplier applied to the score of a tool whose breaker is open.
    pub open_circuit_penalty: f64,
    pub success_rate_threshold: f64,
    pub success_bonus: f64,
    /// Invocations needed before the success rate is trusted.
    pub min_samples: u64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            capability: 0.6,
            schema: 0.4,
            open_circuit_penalty: 0.1,
            success_rate_threshold: 0.9,
            success_bonus: 0.05,
            min_samples: 5,
        }
    }
}

/// Live health of a tool as seen by the scorer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolStanding {
    pub circuit: CircuitState,
    pub success_rate: Option<f64>,
    pub samples: u64,
}

impl Default for ToolStanding {
    fn default() -> Self {
        Self {
            circuit: CircuitState::Closed,
            success_rate: None,
            samples: 0,
        }
    }
}

/// Coarse label derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            Priority::High
        } else if score > 0.6 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// Individual terms of a tool's score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub capability_overlap: f64,
    pub schema_match: f64,
    pub degraded: bool,
    pub bonus_applied: bool,
    pub score: f64,
}

/// One ranked entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub tool_name: String,
    pub score: f64,
    pub priority: Priority,
    pub rationale: String,
    pub circuit_state: CircuitState,
    #[serde(rename = "estimated_duration_ms", serialize_with = "as_millis")]
    pub estimated_duration: Duration,
}

impl Recommendation {
    pub fn is_degraded(&self) -> bool {
        self.circuit_state == CircuitState::Open
    }
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Scores one descriptor against a query.
pub fn score_tool(
    descriptor: &ToolDescriptor,
    query: &RecommendationQuery,
    standing: &ToolStanding,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    let capability_overlap = if query.goal.is_empty() {
        1.0
    } else {
        descriptor.capabilities().overlap_count(&query.goal) as f64 / query.goal.len() as f64
    };
    let schema_match = descriptor.input_schema().compatibility(&query.data_fields());

    let mut score = weights.capability * capability_overlap + weights.schema * schema_match;

    let degraded = standing.circuit == CircuitState::Open;
    if degraded {
        score *= weights.open_circuit_penalty;
    }

    let bonus_applied = !degraded
        && standing.samples >= weights.min_samples
        && standing
            .success_rate
            .is_some_and(|rate| rate > weights.success_rate_threshold);
    if bonus_applied {
        score += weights.success_bonus;
    }

    ScoreBreakdown {
        capability_overlap,
        schema_match,
        degraded,
        bonus_applied,
        score: score.clamp(0.0, 1.0),
    }
}

/// Builds the ranked entry for a scored tool.
pub fn recommendation(
    descriptor: &ToolDescriptor,
    query: &RecommendationQuery,
    standing: &ToolStanding,
    breakdown: &ScoreBreakdown,
) -> Recommendation {
    Recommendation {
        tool_name: descriptor.name().to_string(),
        score: breakdown.score,
        priority: Priority::from_score(breakdown.score),
        rationale: rationale(descriptor, query, standing, breakdown),
        circuit_state: standing.circuit,
        estimated_duration: descriptor.estimated_duration(),
    }
}

fn rationale(
    descriptor: &ToolDescriptor,
    query: &RecommendationQuery,
    standing: &ToolStanding,
    breakdown: &ScoreBreakdown,
) -> String {
    let mut parts = Vec::new();
    if query.goal.is_empty() {
        parts.push("no capability goal given".to_string());
    } else {
        parts.push(format!(
            "covers {}/{} goal capabilities ({})",
            descriptor.capabilities().overlap_count(&query.goal),
            query.goal.len(),
            descriptor.capabilities()
        ));
    }
    parts.push(format!(
        "{:.0}% of required inputs available",
        breakdown.schema_match * 100.0
    ));
    if breakdown.degraded {
        parts.push("circuit OPEN, score penalized".to_string());
    }
    if breakdown.bonus_applied {
        if let Some(rate) = standing.success_rate {
            parts.push(format!("recent success rate {:.0}%", rate * 100.0));
        }
    }
    parts.join("; ")
}

/// Orders recommendations: healthy before degraded, then score descending,
/// then estimated duration ascending, then name.
pub fn rank(mut recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    recommendations.sort_by(|a, b| {
        a.is_degraded()
            .cmp(&b.is_degraded())
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
            .then_with(|| a.estimated_duration.cmp(&b.estimated_duration))
            .then_with(|| a.tool_name.cmp(&b.tool_name))
    });
    recommendations
}

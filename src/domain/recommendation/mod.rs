//! Recommendation module - query shape and the pure scoring rules.

mod query;
mod scoring;

pub use query::{RecommendationQuery, SequenceMetadata};
pub use scoring::{rank, recommendation, score_tool, Priority, Recommendation, ScoreBreakdown, ScoringWeights, ToolStanding};

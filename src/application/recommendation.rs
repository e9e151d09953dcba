//! RecommendationEngine - ranks registered tools for a scientific context.

use crate::domain::recommendation::{
    rank, recommendation, score_tool, Recommendation, RecommendationQuery, ScoringWeights,
    ToolStanding,
};

use super::registry::ToolRegistry;

/// Scores every registered tool against a query and returns a full ranking.
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    weights: ScoringWeights,
}

impl RecommendationEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Ranks the registry for `query`.
    ///
    /// Returns an empty list when the registry is empty, or when the query
    /// names a goal and no tool shares a capability with it. Otherwise every
    /// tool is ranked; callers choose the cutoff.
    pub fn recommend<F>(
        &self,
        query: &RecommendationQuery,
        registry: &ToolRegistry,
        standing: F,
    ) -> Vec<Recommendation>
    where
        F: Fn(&str) -> ToolStanding,
    {
        let descriptors = registry.all();
        if descriptors.is_empty() {
            return Vec::new();
        }
        if !query.goal.is_empty()
            && !descriptors
                .iter()
                .any(|d| d.capabilities().intersects(&query.goal))
        {
            tracing::debug!(goal = %query.goal, "No tool matches the recommendation goal");
            return Vec::new();
        }

        let scored = descriptors
            .iter()
            .map(|descriptor| {
                let standing = standing(descriptor.name());
                let breakdown = score_tool(descriptor, query, &standing, &self.weights);
                recommendation(descriptor, query, &standing, &breakdown)
            })
            .collect();
        rank(scored)
    }
}

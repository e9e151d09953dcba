//! Capability tags describing what kind of science a tool performs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Closed set of capability tags a tool can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCapability {
    Bioinformatics,
    Hardware,
    AiAnalysis,
    DataProcessing,
    Visualization,
}

impl ToolCapability {
    /// Returns all capabilities in canonical order.
    pub fn all() -> &'static [ToolCapability] {
        &[
            ToolCapability::Bioinformatics,
            ToolCapability::Hardware,
            ToolCapability::AiAnalysis,
            ToolCapability::DataProcessing,
            ToolCapability::Visualization,
        ]
    }

    /// Returns the wire tag (e.g. "ai_analysis").
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCapability::Bioinformatics => "bioinformatics",
            ToolCapability::Hardware => "hardware",
            ToolCapability::AiAnalysis => "ai_analysis",
            ToolCapability::DataProcessing => "data_processing",
            ToolCapability::Visualization => "visualization",
        }
    }
}

impl fmt::Display for ToolCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ToolCapability {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        ToolCapability::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                ValidationError::invalid_format("capability", format!("unknown capability '{}'", s))
            })
    }
}

/// Ordered set of capability tags; insertion order is kept, duplicates dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(Vec<ToolCapability>);

impl CapabilitySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds a capability if not already present. Returns true if inserted.
    pub fn insert(&mut self, capability: ToolCapability) -> bool {
        if self.0.contains(&capability) {
            return false;
        }
        self.0.push(capability);
        true
    }

    pub fn contains(&self, capability: ToolCapability) -> bool {
        self.0.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = ToolCapability> + '_ {
        self.0.iter().copied()
    }

    /// True if the two sets share at least one tag.
    pub fn intersects(&self, other: &CapabilitySet) -> bool {
        self.iter().any(|c| other.contains(c))
    }

    /// Number of tags in `self` that also appear in `other`.
    pub fn overlap_count(&self, other: &CapabilitySet) -> usize {
        self.iter().filter(|c| other.contains(*c)).count()
    }
}

impl FromIterator<ToolCapability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = ToolCapability>>(iter: I) -> Self {
        let mut set = CapabilitySet::new();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

impl<const N: usize> From<[ToolCapability; N]> for CapabilitySet {
    fn from(caps: [ToolCapability; N]) -> Self {
        caps.into_iter().collect()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.0.iter().map(|c| c.as_str()).collect();
        write!(f, "{}", tags.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_case_insensitively() {
        assert_eq!("Bioinformatics".parse::<ToolCapability>().unwrap(), ToolCapability::Bioinformatics);
        assert_eq!("ai-analysis".parse::<ToolCapability>().unwrap(), ToolCapability::AiAnalysis);
        assert!("alchemy".parse::<ToolCapability>().is_err());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&ToolCapability::DataProcessing).unwrap();
        assert_eq!(json, r#""data_processing""#);
    }

    #[test]
    fn set_keeps_insertion_order_and_drops_duplicates() {
        let set: CapabilitySet = [
            ToolCapability::AiAnalysis,
            ToolCapability::Bioinformatics,
            ToolCapability::AiAnalysis,
        ]
        .into();

        assert_eq!(set.len(), 2);
        assert_eq!(set.to_string(), "ai_analysis, bioinformatics");
    }

    #[test]
    fn overlap_counts_shared_tags() {
        let a: CapabilitySet = [ToolCapability::Bioinformatics, ToolCapability::AiAnalysis].into();
        let b: CapabilitySet = [ToolCapability::AiAnalysis].into();
        let c: CapabilitySet = [ToolCapability::Hardware].into();

        assert_eq!(a.overlap_count(&b), 1);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}

//! RecommendationQuery - the scientific context a caller asks about.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::sequence::MoleculeType;
use crate::domain::tool::{CapabilitySet, ToolCapability};

/// What is known about the sequence under analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub molecule_type: Option<MoleculeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organism: Option<String>,
}

/// Free-form context scored against the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationQuery {
    /// Capabilities the analysis goal calls for. Empty means "anything".
    #[serde(default)]
    pub goal: CapabilitySet,

    /// Data fields the caller already holds (e.g. "sequence", "protein_ids").
    #[serde(default)]
    pub available_fields: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<SequenceMetadata>,

    /// Results already obtained from earlier tools, keyed by signal name.
    #[serde(default)]
    pub signals: BTreeMap<String, Value>,
}

impl RecommendationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_goal(goal: impl IntoIterator<Item = ToolCapability>) -> Self {
        Self {
            goal: goal.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.available_fields.push(field.into());
        self
    }

    pub fn with_sequence(mut self, sequence: SequenceMetadata) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn with_signal(mut self, name: impl Into<String>, value: Value) -> Self {
        self.signals.insert(name.into(), value);
        self
    }

    /// Every data field the caller can supply to a tool.
    ///
    /// Explicit fields, signal names, `sequence` when sequence metadata is
    /// present and `organism` when it names one.
    pub fn data_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.available_fields.clone();
        fields.extend(self.signals.keys().cloned());
        if let Some(sequence) = &self.sequence {
            fields.push("sequence".to_string());
            if sequence.organism.is_some() {
                fields.push("organism".to_string());
            }
        }
        fields.sort();
        fields.dedup();
        fields
    }
}

//! Local sequence feature computation.
//!
//! Computes length, molecule type, GC content and residue composition for a
//! nucleotide or protein sequence entirely in process.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::domain::foundation::ValidationError;
use crate::domain::invocation::Parameters;
use crate::domain::sequence::MoleculeType;
use crate::domain::tool::{FieldKind, ToolCapability, ToolDescriptor, ToolSchema};
use crate::ports::{AdapterError, HealthStatus, InvocationContext, ToolAdapter};

pub const SEQUENCE_FEATURES_TOOL: &str = "sequence_features";

/// Longest sequence accepted, in residues.
const MAX_SEQUENCE_LENGTH: usize = 1_000_000;

const HYDROPHOBIC: &str = "AVILMFWC";

/// Feature computation adapter.
#[derive(Debug, Default, Clone)]
pub struct SequenceFeaturesAdapter;

impl SequenceFeaturesAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Catalog entry for this tool.
    pub fn descriptor() -> Result<ToolDescriptor, ValidationError> {
        ToolDescriptor::builder(SEQUENCE_FEATURES_TOOL)
            .display_name("Sequence Features")
            .description("Length, molecule type, GC content and composition of a sequence")
            .capabilities([ToolCapability::Bioinformatics, ToolCapability::DataProcessing])
            .input_schema(ToolSchema::new().required("sequence", FieldKind::String))
            .output_schema(
                ToolSchema::new()
                    .required("length", FieldKind::Integer)
                    .required("molecule_type", FieldKind::String)
                    .required("composition", FieldKind::Object)
                    .optional("gc_content", FieldKind::Number)
                    .optional("hydrophobic_fraction", FieldKind::Number),
            )
            .estimated_duration(Duration::from_millis(50))
            .version("1.0.0")
            .build()
    }

    /// Computes the feature set for a raw sequence string.
    pub fn compute(sequence: &str) -> Result<Value, ValidationError> {
        let residues: String = sequence
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if residues.is_empty() {
            return Err(ValidationError::empty_field("sequence"));
        }
        if residues.len() > MAX_SEQUENCE_LENGTH {
            return Err(ValidationError::out_of_range(
                "sequence",
                1,
                MAX_SEQUENCE_LENGTH as i64,
                residues.len() as i64,
            ));
        }
        let molecule_type = MoleculeType::classify(&residues).ok_or_else(|| {
            ValidationError::invalid_format("sequence", "not a nucleotide or protein alphabet")
        })?;

        let mut composition: BTreeMap<char, usize> = BTreeMap::new();
        for residue in residues.chars() {
            *composition.entry(residue).or_insert(0) += 1;
        }
        let length = residues.len();
        let fraction = |letters: &str| {
            let count: usize = letters
                .chars()
                .map(|c| composition.get(&c).copied().unwrap_or(0))
                .sum();
            round4(count as f64 / length as f64)
        };

        let mut features = json!({
            "length": length,
            "molecule_type": molecule_type,
            "composition": composition
                .iter()
                .map(|(residue, count)| (residue.to_string(), json!(count)))
                .collect::<serde_json::Map<String, Value>>(),
        });
        match molecule_type {
            MoleculeType::Dna | MoleculeType::Rna => {
                features["gc_content"] = json!(fraction("GC"));
            }
            MoleculeType::Protein => {
                features["hydrophobic_fraction"] = json!(fraction(HYDROPHOBIC));
            }
        }
        Ok(features)
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[async_trait]
impl ToolAdapter for SequenceFeaturesAdapter {
    async fn invoke(
        &self,
        params: &Parameters,
        ctx: &InvocationContext,
    ) -> Result<Value, AdapterError> {
        if ctx.is_cancelled() {
            return Err(AdapterError::Execution("cancelled before start".to_string()));
        }
        let sequence = params
            .get("sequence")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::missing_field("sequence"))?;

        tracing::debug!(
            correlation_id = %ctx.correlation.correlation_id,
            length = sequence.len(),
            "Computing sequence features"
        );
        Ok(Self::compute(sequence)?)
    }

    async fn health_check(&self) -> HealthStatus {
        match Self::compute("ATCG") {
            Ok(_) => HealthStatus::healthy("local computation available"),
            Err(e) => HealthStatus::unhealthy(e.to_string()),
        }
    }

    fn estimated_cost(&self, params: &Parameters) -> Duration {
        let length = params
            .get("sequence")
            .and_then(Value::as_str)
            .map(str::len)
            .unwrap_or(0);
        Duration::from_millis(1 + (length / 10_000) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::invocation::CorrelationContext;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> InvocationContext {
        InvocationContext::new(
            CorrelationContext::new(),
            Duration::from_secs(1),
            CancellationToken::new(),
        )
    }

    fn params(sequence: &str) -> Parameters {
        let mut p = Parameters::new();
        p.insert("sequence".into(), json!(sequence));
        p
    }

    #[test]
    fn computes_dna_features() {
        let features = SequenceFeaturesAdapter::compute("ATGC gcGC").unwrap();

        assert_eq!(features["length"], 8);
        assert_eq!(features["molecule_type"], "dna");
        assert_eq!(features["gc_content"], 0.75);
        assert_eq!(features["composition"]["G"], 3);
    }

    #[test]
    fn computes_protein_features() {
        let features = SequenceFeaturesAdapter::compute("MKWV").unwrap();

        assert_eq!(features["molecule_type"], "protein");
        assert_eq!(features["hydrophobic_fraction"], 0.75);
        assert!(features.get("gc_content").is_none());
    }

    #[test]
    fn rejects_unknown_alphabet() {
        assert!(matches!(
            SequenceFeaturesAdapter::compute("ATG#"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            SequenceFeaturesAdapter::compute("  "),
            Err(ValidationError::EmptyField { .. })
        ));
    }

    #[tokio::test]
    async fn invoke_maps_bad_input_to_invalid_parameters() {
        let adapter = SequenceFeaturesAdapter::new();
        let err = adapter.invoke(&params("12345"), &ctx()).await.unwrap_err();

        assert!(matches!(err, AdapterError::InvalidParameters(_)));
        assert!(!err.is_execution_failure());
    }

    #[tokio::test]
    async fn invoke_returns_features() {
        let adapter = SequenceFeaturesAdapter::new();
        let features = adapter.invoke(&params("AUGC"), &ctx()).await.unwrap();
        assert_eq!(features["molecule_type"], "rna");
        assert!(adapter.health_check().await.healthy);
    }

    #[test]
    fn descriptor_requires_sequence() {
        let descriptor = SequenceFeaturesAdapter::descriptor().unwrap();
        assert_eq!(descriptor.name(), SEQUENCE_FEATURES_TOOL);
        assert!(descriptor.has_capability(ToolCapability::Bioinformatics));
        assert_eq!(descriptor.input_schema().compatibility(&["sequence"]), 1.0);
    }
}

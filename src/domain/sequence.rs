//! Biological sequence classification shared by the recommender and the
//! local feature adapter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Molecule a sequence string encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoleculeType {
    Dna,
    Rna,
    Protein,
}

impl MoleculeType {
    /// Guesses the molecule type from residue letters.
    ///
    /// Nucleotide alphabets win over protein when both fit. Returns `None`
    /// for empty input or letters outside every alphabet.
    pub fn classify(sequence: &str) -> Option<Self> {
        let residues: Vec<char> = sequence
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if residues.is_empty() {
            return None;
        }

        let is_dna = residues.iter().all(|c| matches!(c, 'A' | 'C' | 'G' | 'T' | 'N'));
        if is_dna {
            return Some(MoleculeType::Dna);
        }
        let is_rna = residues.iter().all(|c| matches!(c, 'A' | 'C' | 'G' | 'U' | 'N'));
        if is_rna {
            return Some(MoleculeType::Rna);
        }
        if residues.iter().all(|c| PROTEIN_ALPHABET.contains(*c)) {
            return Some(MoleculeType::Protein);
        }
        None
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MoleculeType::Dna => "dna",
            MoleculeType::Rna => "rna",
            MoleculeType::Protein => "protein",
        }
    }
}

impl fmt::Display for MoleculeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Twenty standard amino acids plus ambiguity codes and stop.
const PROTEIN_ALPHABET: &str = "ACDEFGHIKLMNPQRSTVWYBZX*";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_nucleotides_and_proteins() {
        assert_eq!(MoleculeType::classify("ATCGATCG"), Some(MoleculeType::Dna));
        assert_eq!(MoleculeType::classify("aucg gauc"), Some(MoleculeType::Rna));
        assert_eq!(MoleculeType::classify("MKTAYIAKQR"), Some(MoleculeType::Protein));
    }

    #[test]
    fn rejects_empty_and_foreign_letters() {
        assert_eq!(MoleculeType::classify("   "), None);
        assert_eq!(MoleculeType::classify("ATCG-123"), None);
    }
}

//! Evidence edges - directed, typed relations between claims

use crate::ids::string_id;
use crate::ClaimId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

string_id!(
    /// Unique identifier for an evidence edge
    EdgeId
);

/// Type of evidential relation between two claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// The source claim is evidence for the target
    Supports,
    /// The source claim is evidence against the target
    Opposes,
    /// The target only holds if the source holds
    Assumes,
    /// The source claim defeats the target outright
    Defeats,
    /// The source claim asserts the negation of the target
    Rebuts,
    /// The source claim attacks the target's grounds rather than its conclusion
    Undercuts,
    /// The source claim is a newer version of the target
    Supersedes,
    /// The source's subject depends on the target's subject
    DependsOn,
}

impl EdgeType {
    /// Get the edge type as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Supports => "supports",
            EdgeType::Opposes => "opposes",
            EdgeType::Assumes => "assumes",
            EdgeType::Defeats => "defeats",
            EdgeType::Rebuts => "rebuts",
            EdgeType::Undercuts => "undercuts",
            EdgeType::Supersedes => "supersedes",
            EdgeType::DependsOn => "depends_on",
        }
    }

    /// Parse an edge type from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "supports" => Some(EdgeType::Supports),
            "opposes" => Some(EdgeType::Opposes),
            "assumes" => Some(EdgeType::Assumes),
            "defeats" => Some(EdgeType::Defeats),
            "rebuts" => Some(EdgeType::Rebuts),
            "undercuts" => Some(EdgeType::Undercuts),
            "supersedes" => Some(EdgeType::Supersedes),
            "depends_on" => Some(EdgeType::DependsOn),
            _ => None,
        }
    }

    /// Whether the relation weakens its target
    pub fn is_adversarial(&self) -> bool {
        matches!(
            self,
            EdgeType::Opposes | EdgeType::Defeats | EdgeType::Rebuts | EdgeType::Undercuts
        )
    }
}

/// A directed relation `from_claim_id → to_claim_id`
///
/// Both endpoints must reference existing claims when the edge is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceEdge {
    /// Unique identifier
    pub id: EdgeId,

    /// Source claim
    pub from_claim_id: ClaimId,

    /// Target claim
    pub to_claim_id: ClaimId,

    /// Relation type
    pub edge_type: EdgeType,

    /// Strength of the relation [0.0, 1.0]
    pub strength: f64,

    /// When the edge was established (ms since epoch)
    pub created_at: u64,

    /// Free-form producer metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl EvidenceEdge {
    /// Create a new edge with a generated id
    pub fn new(
        from_claim_id: ClaimId,
        to_claim_id: ClaimId,
        edge_type: EdgeType,
        strength: f64,
        created_at: u64,
    ) -> Self {
        Self {
            id: EdgeId::new(),
            from_claim_id,
            to_claim_id,
            edge_type,
            strength,
            created_at,
            metadata: BTreeMap::new(),
        }
    }

    /// Builder-style id override
    pub fn with_id(mut self, id: impl Into<EdgeId>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check structural validity before storage
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.strength) {
            return Err(format!("Edge {} strength {} is outside [0.0, 1.0]", self.id, self.strength));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_validation() {
        let edge = EvidenceEdge::new("a".into(), "b".into(), EdgeType::Supports, 0.8, 1000);
        assert!(edge.validate().is_ok());

        let bad = EvidenceEdge::new("a".into(), "b".into(), EdgeType::Supports, 1.5, 1000);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_edge_type_parse() {
        assert_eq!(EdgeType::parse("depends_on"), Some(EdgeType::DependsOn));
        assert_eq!(EdgeType::parse("SUPPORTS"), Some(EdgeType::Supports));
        assert_eq!(EdgeType::parse("likes"), None);
        assert!(EdgeType::Rebuts.is_adversarial());
        assert!(!EdgeType::Supports.is_adversarial());
    }

    #[test]
    fn test_self_loops_are_allowed() {
        // Cycles (including self-loops) are legal; traversal guards against them.
        let edge = EvidenceEdge::new("a".into(), "a".into(), EdgeType::Supersedes, 1.0, 1000);
        assert!(edge.validate().is_ok());
    }
}

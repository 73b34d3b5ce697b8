//! Contradictions - explicit records of claims in tension
//!
//! Contradictions are never reconciled silently. They stay unresolved until a
//! resolver supplies a complete [`ContradictionResolution`].

use crate::ids::string_id;
use crate::ClaimId;
use serde::{Deserialize, Serialize};

string_id!(
    /// Unique identifier for a contradiction
    ContradictionId
);

/// How two claims conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionType {
    /// Opposite polarity about the same subject
    Direct,
    /// Both were true at different times
    Temporal,
    /// Each holds in a different scope
    Scope,
    /// One implies the negation of the other
    Implicational,
}

impl ContradictionType {
    /// Get the type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ContradictionType::Direct => "direct",
            ContradictionType::Temporal => "temporal",
            ContradictionType::Scope => "scope",
            ContradictionType::Implicational => "implicational",
        }
    }

    /// Parse a type from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "direct" => Some(ContradictionType::Direct),
            "temporal" => Some(ContradictionType::Temporal),
            "scope" => Some(ContradictionType::Scope),
            "implicational" => Some(ContradictionType::Implicational),
            _ => None,
        }
    }
}

/// How urgently a contradiction must be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionSeverity {
    /// Can wait
    Minor,
    /// Should be reviewed soon
    Significant,
    /// Both claims are unusable until resolved
    Blocking,
}

impl ContradictionSeverity {
    /// Get the severity name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ContradictionSeverity::Minor => "minor",
            ContradictionSeverity::Significant => "significant",
            ContradictionSeverity::Blocking => "blocking",
        }
    }

    /// Parse a severity from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "minor" => Some(ContradictionSeverity::Minor),
            "significant" => Some(ContradictionSeverity::Significant),
            "blocking" => Some(ContradictionSeverity::Blocking),
            _ => None,
        }
    }
}

/// Contradiction lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionStatus {
    /// Awaiting a resolver
    Unresolved,
    /// Resolved with an explicit resolution
    Resolved,
}

impl ContradictionStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ContradictionStatus::Unresolved => "unresolved",
            ContradictionStatus::Resolved => "resolved",
        }
    }

    /// Parse a status from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "unresolved" => Some(ContradictionStatus::Unresolved),
            "resolved" => Some(ContradictionStatus::Resolved),
            _ => None,
        }
    }
}

/// How a contradiction was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Claim A holds
    PreferA,
    /// Claim B holds
    PreferB,
    /// Both hold in different scopes
    BothValidInScope,
    /// One claim is an outdated version of the other
    Superseded,
    /// Neither claim holds
    RetractedBoth,
}

impl ResolutionMethod {
    /// Get the method name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMethod::PreferA => "prefer_a",
            ResolutionMethod::PreferB => "prefer_b",
            ResolutionMethod::BothValidInScope => "both_valid_in_scope",
            ResolutionMethod::Superseded => "superseded",
            ResolutionMethod::RetractedBoth => "retracted_both",
        }
    }

    /// Parse a method from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "prefer_a" => Some(ResolutionMethod::PreferA),
            "prefer_b" => Some(ResolutionMethod::PreferB),
            "both_valid_in_scope" => Some(ResolutionMethod::BothValidInScope),
            "superseded" => Some(ResolutionMethod::Superseded),
            "retracted_both" => Some(ResolutionMethod::RetractedBoth),
            _ => None,
        }
    }
}

/// A complete resolution; every field is required
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionResolution {
    /// Settlement method
    pub method: ResolutionMethod,
    /// Why this method was chosen
    pub explanation: String,
    /// Who resolved it
    pub resolver: String,
    /// When it was resolved (ms since epoch)
    pub resolved_at: u64,
    /// What was given up
    pub tradeoff: String,
}

impl ContradictionResolution {
    /// Check that the explanatory fields are filled in
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("explanation", &self.explanation),
            ("resolver", &self.resolver),
            ("tradeoff", &self.tradeoff),
        ] {
            if value.trim().is_empty() {
                return Err(format!("Resolution {} cannot be empty", name));
            }
        }
        Ok(())
    }
}

/// Two claims whose propositions are logically in tension
///
/// The pair is unordered; `claim_a`/`claim_b` only name the sides for
/// [`ResolutionMethod::PreferA`] and [`ResolutionMethod::PreferB`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    /// Unique identifier
    pub id: ContradictionId,
    /// First claim
    pub claim_a: ClaimId,
    /// Second claim
    pub claim_b: ClaimId,
    /// Kind of tension
    pub contradiction_type: ContradictionType,
    /// Why the claims conflict
    pub explanation: String,
    /// Urgency
    pub severity: ContradictionSeverity,
    /// Lifecycle status
    pub status: ContradictionStatus,
    /// Present iff status is resolved
    pub resolution: Option<ContradictionResolution>,
    /// When the contradiction was detected (ms since epoch)
    pub detected_at: u64,
}

impl Contradiction {
    /// Create an unresolved contradiction with a generated id
    pub fn new(
        claim_a: ClaimId,
        claim_b: ClaimId,
        contradiction_type: ContradictionType,
        severity: ContradictionSeverity,
        explanation: impl Into<String>,
        detected_at: u64,
    ) -> Self {
        Self {
            id: ContradictionId::new(),
            claim_a,
            claim_b,
            contradiction_type,
            explanation: explanation.into(),
            severity,
            status: ContradictionStatus::Unresolved,
            resolution: None,
            detected_at,
        }
    }

    /// Builder-style id override
    pub fn with_id(mut self, id: impl Into<ContradictionId>) -> Self {
        self.id = id.into();
        self
    }

    /// Whether the contradiction involves the given claim
    pub fn involves(&self, claim_id: &ClaimId) -> bool {
        &self.claim_a == claim_id || &self.claim_b == claim_id
    }

    /// Whether this contradiction is between `a` and `b`, in either order
    pub fn pairs(&self, a: &ClaimId, b: &ClaimId) -> bool {
        (&self.claim_a == a && &self.claim_b == b) || (&self.claim_a == b && &self.claim_b == a)
    }

    /// The other side of the pair, if `claim_id` is one side
    pub fn counterpart(&self, claim_id: &ClaimId) -> Option<&ClaimId> {
        if &self.claim_a == claim_id {
            Some(&self.claim_b)
        } else if &self.claim_b == claim_id {
            Some(&self.claim_a)
        } else {
            None
        }
    }

    /// Check structural validity before storage
    pub fn validate(&self) -> Result<(), String> {
        if self.claim_a == self.claim_b {
            return Err(format!("Contradiction {} pairs claim {} with itself", self.id, self.claim_a));
        }
        match (self.status, &self.resolution) {
            (ContradictionStatus::Resolved, None) => Err("Resolution required".to_string()),
            (ContradictionStatus::Resolved, Some(resolution)) => resolution.validate(),
            (ContradictionStatus::Unresolved, Some(_)) => Err(format!(
                "Contradiction {} is unresolved but carries a resolution",
                self.id
            )),
            (ContradictionStatus::Unresolved, None) => Ok(()),
        }
    }
}

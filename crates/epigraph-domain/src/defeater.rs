//! Defeaters - detected reasons to weaken or retract claims
//!
//! Terminology follows Pollock's defeasible reasoning: a defeater either
//! rebuts a claim (evidence for its negation), undercuts it (attacks the link
//! between evidence and claim), or undermines it (attacks the evidence itself).

use crate::ids::string_id;
use crate::{ClaimId, SignalComponent};
use serde::{Deserialize, Serialize};

string_id!(
    /// Unique identifier for a defeater
    DefeaterId
);

/// Closed set of defeating conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefeaterType {
    /// The claim has aged past its freshness threshold
    Staleness,
    /// A file the claim describes has changed
    CodeChange,
    /// A test that produced or covers the claim failed
    TestFailure,
    /// The content hash recorded with the claim no longer matches
    HashMismatch,
    /// The provider that produced the claim is unavailable
    ProviderUnavailable,
    /// The claim is in tension with another claim
    Contradiction,
    /// The tool that produced the claim failed
    ToolFailure,
    /// The claim was produced in an environment that differs from production
    SandboxMismatch,
    /// The claim's subject is not covered by retrieval or tests
    CoverageGap,
    /// New information bears on the claim
    NewInfo,
}

impl DefeaterType {
    /// Every defeater type
    pub const ALL: [DefeaterType; 10] = [
        DefeaterType::Staleness,
        DefeaterType::CodeChange,
        DefeaterType::TestFailure,
        DefeaterType::HashMismatch,
        DefeaterType::ProviderUnavailable,
        DefeaterType::Contradiction,
        DefeaterType::ToolFailure,
        DefeaterType::SandboxMismatch,
        DefeaterType::CoverageGap,
        DefeaterType::NewInfo,
    ];

    /// Get the type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DefeaterType::Staleness => "staleness",
            DefeaterType::CodeChange => "code_change",
            DefeaterType::TestFailure => "test_failure",
            DefeaterType::HashMismatch => "hash_mismatch",
            DefeaterType::ProviderUnavailable => "provider_unavailable",
            DefeaterType::Contradiction => "contradiction",
            DefeaterType::ToolFailure => "tool_failure",
            DefeaterType::SandboxMismatch => "sandbox_mismatch",
            DefeaterType::CoverageGap => "coverage_gap",
            DefeaterType::NewInfo => "new_info",
        }
    }

    /// Parse a type from a string
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s.to_lowercase())
    }

    /// Signal components this defeater weakens, with per-component weights
    ///
    /// A reduction of `r` lowers each listed component by `r × weight`.
    pub fn reduction_profile(&self) -> &'static [(SignalComponent, f64)] {
        use SignalComponent::*;
        match self {
            DefeaterType::CodeChange | DefeaterType::HashMismatch => &[(Structural, 1.0), (Recency, 1.0)],
            DefeaterType::TestFailure => &[(TestExecution, 1.0)],
            DefeaterType::Staleness => &[(Recency, 1.0)],
            DefeaterType::Contradiction | DefeaterType::NewInfo => &[(Semantic, 1.0)],
            DefeaterType::CoverageGap => &[(Retrieval, 1.0)],
            DefeaterType::ToolFailure | DefeaterType::SandboxMismatch => &[(Structural, 1.0)],
            DefeaterType::ProviderUnavailable => &[(Retrieval, 0.5), (Semantic, 0.5)],
        }
    }

    /// Remediation offered when a defeater carries no explicit action
    pub fn default_remediation(&self) -> Remediation {
        match self {
            DefeaterType::Staleness | DefeaterType::NewInfo => Remediation::Revalidate,
            DefeaterType::CodeChange | DefeaterType::HashMismatch => Remediation::Reindex,
            DefeaterType::TestFailure => Remediation::RerunTests,
            DefeaterType::ProviderUnavailable | DefeaterType::ToolFailure => Remediation::RetryProvider,
            DefeaterType::Contradiction => Remediation::ReviewContradiction,
            DefeaterType::SandboxMismatch | DefeaterType::CoverageGap => Remediation::GatherEvidence,
        }
    }
}

/// How badly a defeater damages the claims it covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefeaterSeverity {
    /// Confidence should be lowered a little
    Warning,
    /// Confidence should be lowered substantially
    Partial,
    /// The claim is retracted
    Full,
}

impl DefeaterSeverity {
    /// Get the severity name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DefeaterSeverity::Warning => "warning",
            DefeaterSeverity::Partial => "partial",
            DefeaterSeverity::Full => "full",
        }
    }

    /// Parse a severity from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "warning" => Some(DefeaterSeverity::Warning),
            "partial" => Some(DefeaterSeverity::Partial),
            "full" => Some(DefeaterSeverity::Full),
            _ => None,
        }
    }
}

/// Defeater lifecycle: pending → active → resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefeaterStatus {
    /// Detected but not yet applied
    Pending,
    /// Applied to its claims
    Active,
    /// Remediated
    Resolved,
}

impl DefeaterStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DefeaterStatus::Pending => "pending",
            DefeaterStatus::Active => "active",
            DefeaterStatus::Resolved => "resolved",
        }
    }

    /// Parse a status from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(DefeaterStatus::Pending),
            "active" => Some(DefeaterStatus::Active),
            "resolved" => Some(DefeaterStatus::Resolved),
            _ => None,
        }
    }
}

/// Remediation that resolves a defeater
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remediation {
    /// Re-check the claim against current code
    Revalidate,
    /// Re-extract the subject and refresh hashes
    Reindex,
    /// Re-run the failing tests
    RerunTests,
    /// Retry once the provider or tool is reachable
    RetryProvider,
    /// A person decides which side of a contradiction holds
    ReviewContradiction,
    /// Collect more evidence before trusting the claim
    GatherEvidence,
}

impl Remediation {
    /// Get the remediation name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Remediation::Revalidate => "revalidate",
            Remediation::Reindex => "reindex",
            Remediation::RerunTests => "rerun_tests",
            Remediation::RetryProvider => "retry_provider",
            Remediation::ReviewContradiction => "review_contradiction",
            Remediation::GatherEvidence => "gather_evidence",
        }
    }

    /// Parse a remediation from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "revalidate" => Some(Remediation::Revalidate),
            "reindex" => Some(Remediation::Reindex),
            "rerun_tests" => Some(Remediation::RerunTests),
            "retry_provider" => Some(Remediation::RetryProvider),
            "review_contradiction" => Some(Remediation::ReviewContradiction),
            "gather_evidence" => Some(Remediation::GatherEvidence),
            _ => None,
        }
    }
}

/// A detected reason to weaken or retract one or more claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedDefeater {
    /// Unique identifier
    pub id: DefeaterId,

    /// Defeating condition
    pub defeater_type: DefeaterType,

    /// Human-readable summary
    pub description: String,

    /// Damage level
    pub severity: DefeaterSeverity,

    /// Claims this defeater covers (never empty)
    pub affected_claim_ids: Vec<ClaimId>,

    /// Amount subtracted from implicated signal components [0.0, 1.0]
    pub confidence_reduction: f64,

    /// Whether remediation can run without a person
    pub auto_resolvable: bool,

    /// Suggested remediation
    pub resolution_action: Option<Remediation>,

    /// Lifecycle status
    pub status: DefeaterStatus,

    /// When the defeater was activated (ms since epoch)
    pub activated_at: Option<u64>,

    /// Free-text evidence (file path, test id, hashes, ...)
    pub evidence: String,

    /// When the defeater was detected (ms since epoch)
    pub detected_at: u64,
}

impl ExtendedDefeater {
    /// Create a pending defeater with a generated id
    pub fn new(
        defeater_type: DefeaterType,
        severity: DefeaterSeverity,
        affected_claim_ids: Vec<ClaimId>,
        confidence_reduction: f64,
        description: impl Into<String>,
        detected_at: u64,
    ) -> Self {
        Self {
            id: DefeaterId::new(),
            defeater_type,
            description: description.into(),
            severity,
            affected_claim_ids,
            confidence_reduction: confidence_reduction.clamp(0.0, 1.0),
            auto_resolvable: false,
            resolution_action: Some(defeater_type.default_remediation()),
            status: DefeaterStatus::Pending,
            activated_at: None,
            evidence: String::new(),
            detected_at,
        }
    }

    /// Builder-style id override
    pub fn with_id(mut self, id: impl Into<DefeaterId>) -> Self {
        self.id = id.into();
        self
    }

    /// Mark the defeater as auto-resolvable
    pub fn auto_resolvable(mut self) -> Self {
        self.auto_resolvable = true;
        self
    }

    /// Attach free-text evidence
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }

    /// Override the suggested remediation
    pub fn with_action(mut self, action: Remediation) -> Self {
        self.resolution_action = Some(action);
        self
    }

    /// Whether this defeater covers the given claim
    pub fn covers(&self, claim_id: &ClaimId) -> bool {
        self.affected_claim_ids.contains(claim_id)
    }

    /// The remediation to offer: the explicit action or the type's default
    pub fn remediation(&self) -> Remediation {
        self.resolution_action
            .unwrap_or_else(|| self.defeater_type.default_remediation())
    }

    /// Check structural validity before storage
    pub fn validate(&self) -> Result<(), String> {
        if self.affected_claim_ids.is_empty() {
            return Err(format!("Defeater {} affects no claims", self.id));
        }
        if !(0.0..=1.0).contains(&self.confidence_reduction) {
            return Err(format!(
                "Defeater {} confidence reduction {} is outside [0.0, 1.0]",
                self.id, self.confidence_reduction
            ));
        }
        if self.status != DefeaterStatus::Pending && self.status != DefeaterStatus::Resolved && self.activated_at.is_none() {
            return Err(format!("Active defeater {} has no activation time", self.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_has_a_reduction_rule() {
        for t in DefeaterType::ALL {
            let profile = t.reduction_profile();
            assert!(!profile.is_empty(), "{} has no reduction rule", t.as_str());
            for (_, weight) in profile {
                assert!(*weight > 0.0 && *weight <= 1.0);
            }
        }
    }

    #[test]
    fn test_provider_unavailable_is_half_weight() {
        let profile = DefeaterType::ProviderUnavailable.reduction_profile();
        assert_eq!(profile, &[(SignalComponent::Retrieval, 0.5), (SignalComponent::Semantic, 0.5)]);
    }

    #[test]
    fn test_type_parse_roundtrip() {
        for t in DefeaterType::ALL {
            assert_eq!(DefeaterType::parse(t.as_str()), Some(t));
        }
        assert_eq!(DefeaterType::parse("gremlins"), None);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(DefeaterSeverity::Full > DefeaterSeverity::Partial);
        assert!(DefeaterSeverity::Partial > DefeaterSeverity::Warning);
    }

    #[test]
    fn test_validate_requires_affected_claims() {
        let d = ExtendedDefeater::new(DefeaterType::Staleness, DefeaterSeverity::Warning, vec![], 0.1, "old", 0);
        assert!(d.validate().is_err());

        let d = ExtendedDefeater::new(DefeaterType::Staleness, DefeaterSeverity::Warning, vec!["c1".into()], 0.1, "old", 0);
        assert!(d.validate().is_ok());
        assert_eq!(d.status, DefeaterStatus::Pending);
        assert_eq!(d.remediation(), Remediation::Revalidate);
    }

    #[test]
    fn test_reduction_is_clamped_on_construction() {
        let d = ExtendedDefeater::new(DefeaterType::TestFailure, DefeaterSeverity::Full, vec!["c1".into()], 3.0, "boom", 0);
        assert_eq!(d.confidence_reduction, 1.0);
    }
}

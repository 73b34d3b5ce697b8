//! Claim module - the fundamental unit of Epigraph's knowledge graph

use crate::ids::string_id;
use crate::SignalStrength;
use serde::{Deserialize, Serialize};

string_id!(
    /// Unique, stable identifier for a claim
    ClaimId
);

/// Semantic category of a claim's proposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    /// What the code means or is for
    Semantic,
    /// How the code is shaped (signatures, types, layout)
    Structural,
    /// How the code changes or behaves over time
    Temporal,
    /// What the code does at runtime
    Behavioral,
    /// How components are arranged
    Architectural,
    /// How entities relate to each other
    Relational,
}

impl ClaimType {
    /// Get the claim type as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Semantic => "semantic",
            ClaimType::Structural => "structural",
            ClaimType::Temporal => "temporal",
            ClaimType::Behavioral => "behavioral",
            ClaimType::Architectural => "architectural",
            ClaimType::Relational => "relational",
        }
    }

    /// Parse a claim type from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "semantic" => Some(ClaimType::Semantic),
            "structural" => Some(ClaimType::Structural),
            "temporal" => Some(ClaimType::Temporal),
            "behavioral" => Some(ClaimType::Behavioral),
            "architectural" => Some(ClaimType::Architectural),
            "relational" => Some(ClaimType::Relational),
            _ => None,
        }
    }
}

impl std::str::FromStr for ClaimType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid claim type: {}", s))
    }
}

/// Lifecycle status of a claim
///
/// ```text
/// active ──▶ stale ──▶ defeated ──▶ stale (after resolution)
///    │          │
///    └──────────┴──▶ contradicted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Currently trusted
    Active,
    /// Needs revalidation before it is trusted again
    Stale,
    /// Retracted by a defeater
    Defeated,
    /// Paired in an unresolved contradiction
    Contradicted,
}

impl ClaimStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Active => "active",
            ClaimStatus::Stale => "stale",
            ClaimStatus::Defeated => "defeated",
            ClaimStatus::Contradicted => "contradicted",
        }
    }

    /// Parse a status from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(ClaimStatus::Active),
            "stale" => Some(ClaimStatus::Stale),
            "defeated" => Some(ClaimStatus::Defeated),
            "contradicted" => Some(ClaimStatus::Contradicted),
            _ => None,
        }
    }

    /// Whether the defeater calculus may still weaken this claim into `defeated`
    /// or `contradicted`
    pub fn is_live(&self) -> bool {
        matches!(self, ClaimStatus::Active | ClaimStatus::Stale)
    }
}

impl std::str::FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid claim status: {}", s))
    }
}

/// Kind of code entity a claim is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// A function or method
    Function,
    /// A type (struct, class, interface, enum)
    Type,
    /// A module or package
    Module,
    /// A single file
    File,
    /// A directory
    Directory,
    /// A whole repository
    Repository,
    /// A test case
    Test,
}

impl SubjectKind {
    /// Get the subject kind as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Function => "function",
            SubjectKind::Type => "type",
            SubjectKind::Module => "module",
            SubjectKind::File => "file",
            SubjectKind::Directory => "directory",
            SubjectKind::Repository => "repository",
            SubjectKind::Test => "test",
        }
    }

    /// Parse a subject kind from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "function" => Some(SubjectKind::Function),
            "type" => Some(SubjectKind::Type),
            "module" => Some(SubjectKind::Module),
            "file" => Some(SubjectKind::File),
            "directory" => Some(SubjectKind::Directory),
            "repository" => Some(SubjectKind::Repository),
            "test" => Some(SubjectKind::Test),
            _ => None,
        }
    }
}

/// Source span of a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectLocation {
    /// Repository-relative file path
    pub file: String,
    /// First line (1-based), if known
    pub start_line: Option<u32>,
    /// Last line (inclusive), if known
    pub end_line: Option<u32>,
}

/// The code entity a claim is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSubject {
    /// Entity kind
    pub kind: SubjectKind,
    /// Stable entity identifier (e.g. `src/auth.py:login`)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Where the entity lives, if known
    pub location: Option<SubjectLocation>,
}

impl ClaimSubject {
    /// Create a subject without a location
    pub fn new(kind: SubjectKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
            location: None,
        }
    }

    /// Attach a file location
    pub fn with_location(mut self, file: impl Into<String>, start_line: Option<u32>, end_line: Option<u32>) -> Self {
        self.location = Some(SubjectLocation {
            file: file.into(),
            start_line,
            end_line,
        });
        self
    }

    /// The subject's file path, if it has a location
    pub fn file(&self) -> Option<&str> {
        self.location.as_ref().map(|l| l.file.as_str())
    }
}

/// Kind of producer that asserted a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A language model
    Llm,
    /// A test run
    Test,
    /// A static analyzer
    StaticAnalysis,
    /// A person
    Human,
    /// Any other tool
    Tool,
}

impl SourceKind {
    /// Get the source kind as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Llm => "llm",
            SourceKind::Test => "test",
            SourceKind::StaticAnalysis => "static_analysis",
            SourceKind::Human => "human",
            SourceKind::Tool => "tool",
        }
    }

    /// Parse a source kind from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "llm" => Some(SourceKind::Llm),
            "test" => Some(SourceKind::Test),
            "static_analysis" => Some(SourceKind::StaticAnalysis),
            "human" => Some(SourceKind::Human),
            "tool" => Some(SourceKind::Tool),
            _ => None,
        }
    }
}

/// Who produced a claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSource {
    /// Producer kind
    pub kind: SourceKind,
    /// Producer identifier (e.g. `openai:gpt-4o`, `tests/test_auth.py::test_login`)
    pub id: String,
    /// Producer version, if known
    pub version: Option<String>,
}

impl ClaimSource {
    /// Create a source without a version
    pub fn new(kind: SourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            version: None,
        }
    }
}

/// A claim - an atomic, confidence-bearing proposition about a code entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,

    /// The asserted proposition
    pub proposition: String,

    /// Semantic category
    pub claim_type: ClaimType,

    /// Entity the claim is about
    pub subject: ClaimSubject,

    /// Producer of the claim
    pub source: ClaimSource,

    /// Lifecycle status
    pub status: ClaimStatus,

    /// Evidence vector
    pub signal_strength: SignalStrength,

    /// When this claim was created (ms since epoch)
    pub created_at: u64,
}

impl Claim {
    /// Create a new active claim
    pub fn new(
        id: ClaimId,
        proposition: impl Into<String>,
        claim_type: ClaimType,
        subject: ClaimSubject,
        source: ClaimSource,
        signal_strength: SignalStrength,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            proposition: proposition.into(),
            claim_type,
            subject,
            source,
            status: ClaimStatus::Active,
            signal_strength,
            created_at,
        }
    }

    /// Builder-style status override
    pub fn with_status(mut self, status: ClaimStatus) -> Self {
        self.status = status;
        self
    }

    /// Age of the claim at `now` in milliseconds (0 if created in the future)
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    /// Check structural validity before storage
    pub fn validate(&self) -> Result<(), String> {
        if self.id.as_str().trim().is_empty() {
            return Err("Claim id cannot be empty".to_string());
        }
        if self.proposition.trim().is_empty() {
            return Err(format!("Claim {} has an empty proposition", self.id));
        }
        if self.subject.id.trim().is_empty() {
            return Err(format!("Claim {} has an empty subject id", self.id));
        }
        if let Some(loc) = &self.subject.location {
            if let (Some(start), Some(end)) = (loc.start_line, loc.end_line) {
                if start > end {
                    return Err(format!(
                        "Claim {} has an inverted line span {}..{}",
                        self.id, start, end
                    ));
                }
            }
        }
        self.signal_strength
            .validate()
            .map_err(|e| format!("Claim {}: {}", self.id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claim() -> Claim {
        Claim::new(
            ClaimId::from("claim-1"),
            "login validates the password hash",
            ClaimType::Behavioral,
            ClaimSubject::new(SubjectKind::Function, "src/auth.py:login", "login")
                .with_location("src/auth.py", Some(10), Some(30)),
            ClaimSource::new(SourceKind::Llm, "openai:gpt-4o"),
            SignalStrength::uniform(0.7),
            1_000,
        )
    }

    #[test]
    fn test_claim_id_generation_is_ordered() {
        let id1 = ClaimId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = ClaimId::new();

        assert!(id1 < id2, "Earlier UUIDv7 should sort before later UUIDv7");
        assert_eq!(id1.as_str().len(), 36);
    }

    #[test]
    fn test_claim_id_from_string() {
        assert_eq!(ClaimId::from_string("  abc ").unwrap().as_str(), "abc");
        assert!(ClaimId::from_string("").is_err());
        assert!(ClaimId::from_string("   ").is_err());
    }

    #[test]
    fn test_new_claim_is_active() {
        let claim = sample_claim();
        assert_eq!(claim.status, ClaimStatus::Active);
        assert!(claim.validate().is_ok());
        assert_eq!(claim.subject.file(), Some("src/auth.py"));
    }

    #[test]
    fn test_validate_rejects_inverted_span() {
        let mut claim = sample_claim();
        claim.subject = claim.subject.with_location("src/auth.py", Some(30), Some(10));
        assert!(claim.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_proposition() {
        let mut claim = sample_claim();
        claim.proposition = "   ".to_string();
        assert!(claim.validate().is_err());
    }

    #[test]
    fn test_enum_string_roundtrip() {
        for status in [ClaimStatus::Active, ClaimStatus::Stale, ClaimStatus::Defeated, ClaimStatus::Contradicted] {
            assert_eq!(ClaimStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!("Temporal".parse::<ClaimType>(), Ok(ClaimType::Temporal));
        assert_eq!(SourceKind::parse("static_analysis"), Some(SourceKind::StaticAnalysis));
        assert!(SubjectKind::parse("galaxy").is_none());
    }

    #[test]
    fn test_age_saturates() {
        let claim = sample_claim();
        assert_eq!(claim.age_ms(500), 0);
        assert_eq!(claim.age_ms(1_500), 500);
    }

    #[test]
    fn test_serde_shape() {
        let claim = sample_claim();
        let json = serde_json::to_value(&claim).unwrap();
        assert_eq!(json["id"], "claim-1");
        assert_eq!(json["claim_type"], "behavioral");
        assert_eq!(json["source"]["kind"], "llm");
    }
}

//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{
    Claim, ClaimId, ClaimStatus, ClaimType, Contradiction, ContradictionId, ContradictionResolution,
    ContradictionSeverity, ContradictionStatus, DefeaterId, DefeaterSeverity, DefeaterStatus,
    DefeaterType, EdgeId, EdgeType, EvidenceEdge, EvidenceGraph, ExtendedDefeater, GraphStats,
    PredictionOutcome, SignalStrength, TraversalResult,
};

/// Durable storage for the evidence graph
///
/// Implemented by the infrastructure layer (epigraph-store). Every data
/// operation fails while the store is not initialized. Reads of unknown ids
/// return `Ok(None)` or an empty list; mutations take `&mut self` so a single
/// writer is enforced by the borrow checker.
pub trait EvidenceStore {
    /// Error type for store operations
    type Error;

    /// Prepare the backing schema; idempotent
    fn initialize(&mut self) -> Result<(), Self::Error>;

    /// Release the backing connection
    fn close(&mut self) -> Result<(), Self::Error>;

    /// Whether data operations are currently allowed
    fn is_initialized(&self) -> bool;

    // Claims

    /// Insert or replace a claim
    fn upsert_claim(&mut self, claim: &Claim) -> Result<(), Self::Error>;

    /// Insert or replace claims in one transaction
    fn upsert_claims(&mut self, claims: &[Claim]) -> Result<(), Self::Error>;

    /// Get a claim by id
    fn get_claim(&self, id: &ClaimId) -> Result<Option<Claim>, Self::Error>;

    /// Delete a claim and everything that references it; returns whether it existed
    fn delete_claim(&mut self, id: &ClaimId) -> Result<bool, Self::Error>;

    /// Claims matching a filter
    fn get_claims(&self, filter: &ClaimFilter) -> Result<Vec<Claim>, Self::Error>;

    /// Change a claim's status; unknown ids are an error
    fn update_claim_status(&mut self, id: &ClaimId, status: ClaimStatus) -> Result<(), Self::Error>;

    /// Replace a claim's signal strength (overall recomputed); unknown ids are an error
    fn update_claim_signal_strength(&mut self, id: &ClaimId, strength: &SignalStrength) -> Result<(), Self::Error>;

    // Edges

    /// Insert or replace an edge; both endpoints must exist
    fn upsert_edge(&mut self, edge: &EvidenceEdge) -> Result<(), Self::Error>;

    /// Insert or replace edges in one transaction
    fn upsert_edges(&mut self, edges: &[EvidenceEdge]) -> Result<(), Self::Error>;

    /// Get an edge by id
    fn get_edge(&self, id: &EdgeId) -> Result<Option<EvidenceEdge>, Self::Error>;

    /// Edges leaving a claim
    fn get_edges_from(&self, id: &ClaimId) -> Result<Vec<EvidenceEdge>, Self::Error>;

    /// Edges entering a claim
    fn get_edges_to(&self, id: &ClaimId) -> Result<Vec<EvidenceEdge>, Self::Error>;

    /// Delete an edge; returns whether it existed
    fn delete_edge(&mut self, id: &EdgeId) -> Result<bool, Self::Error>;

    /// Delete every edge touching a claim; returns the number removed
    fn delete_edges_for_claim(&mut self, id: &ClaimId) -> Result<usize, Self::Error>;

    /// Edges matching a filter
    fn get_edges(&self, filter: &EdgeFilter) -> Result<Vec<EvidenceEdge>, Self::Error>;

    // Defeaters

    /// Insert or replace a defeater; every affected claim must exist
    fn upsert_defeater(&mut self, defeater: &ExtendedDefeater) -> Result<(), Self::Error>;

    /// Insert or replace defeaters in one transaction
    fn upsert_defeaters(&mut self, defeaters: &[ExtendedDefeater]) -> Result<(), Self::Error>;

    /// Get a defeater by id
    fn get_defeater(&self, id: &DefeaterId) -> Result<Option<ExtendedDefeater>, Self::Error>;

    /// Move a pending defeater to active; returns whether the transition happened
    fn activate_defeater(&mut self, id: &DefeaterId) -> Result<bool, Self::Error>;

    /// Move a defeater to resolved; returns whether the transition happened
    fn resolve_defeater(&mut self, id: &DefeaterId) -> Result<bool, Self::Error>;

    /// Defeaters in the active state
    fn get_active_defeaters(&self) -> Result<Vec<ExtendedDefeater>, Self::Error>;

    /// Defeaters covering a claim
    fn get_defeaters_for_claim(&self, id: &ClaimId) -> Result<Vec<ExtendedDefeater>, Self::Error>;

    /// Defeaters matching a filter
    fn get_defeaters(&self, filter: &DefeaterFilter) -> Result<Vec<ExtendedDefeater>, Self::Error>;

    // Contradictions

    /// Insert or replace a contradiction; both claims must exist
    fn upsert_contradiction(&mut self, contradiction: &Contradiction) -> Result<(), Self::Error>;

    /// Get a contradiction by id
    fn get_contradiction(&self, id: &ContradictionId) -> Result<Option<Contradiction>, Self::Error>;

    /// Resolve a contradiction; a missing resolution is an error
    fn resolve_contradiction(
        &mut self,
        id: &ContradictionId,
        resolution: Option<ContradictionResolution>,
    ) -> Result<(), Self::Error>;

    /// Contradictions awaiting resolution
    fn get_unresolved_contradictions(&self) -> Result<Vec<Contradiction>, Self::Error>;

    /// Contradictions involving a claim
    fn get_contradictions_for_claim(&self, id: &ClaimId) -> Result<Vec<Contradiction>, Self::Error>;

    /// Contradictions matching a filter
    fn get_contradictions(&self, filter: &ContradictionFilter) -> Result<Vec<Contradiction>, Self::Error>;

    // Graph

    /// Breadth-first walk along outgoing edges (`max_depth == 0` is unlimited)
    fn traverse_from(&self, start: &ClaimId, max_depth: usize) -> Result<TraversalResult, Self::Error>;

    /// Shortest directed path as ordered edges; empty when unreachable
    fn find_path(&self, from: &ClaimId, to: &ClaimId) -> Result<Vec<EvidenceEdge>, Self::Error>;

    /// Snapshot of the claims in scope and the edges between them
    fn get_full_graph(&self, scope: Option<&ClaimFilter>) -> Result<EvidenceGraph, Self::Error>;

    /// Merge a snapshot into the store in one transaction
    fn save_full_graph(&mut self, graph: &EvidenceGraph) -> Result<(), Self::Error>;

    /// Aggregate counts and mean strength
    fn get_graph_stats(&self) -> Result<GraphStats, Self::Error>;

    // Outcomes

    /// Record the fate of a confidence prediction
    fn record_outcome(&mut self, outcome: &PredictionOutcome) -> Result<(), Self::Error>;

    /// Outcomes for one subject, or all outcomes when `subject_id` is `None`
    fn get_outcomes(&self, subject_id: Option<&str>) -> Result<Vec<PredictionOutcome>, Self::Error>;
}

/// Query criteria for retrieving claims
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimFilter {
    /// Filter by claim type
    pub claim_type: Option<ClaimType>,

    /// Filter by subject id
    pub subject_id: Option<String>,

    /// Filter by status
    pub status: Option<ClaimStatus>,

    /// Filter by minimum overall signal strength
    pub min_strength: Option<f64>,

    /// Maximum results to return
    pub limit: Option<usize>,

    /// Results to skip
    pub offset: Option<usize>,
}

impl ClaimFilter {
    /// Claims with the given status
    pub fn with_status(status: ClaimStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Claims about the given subject
    pub fn for_subject(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: Some(subject_id.into()),
            ..Default::default()
        }
    }

    /// Whether a claim passes every criterion except paging
    pub fn matches(&self, claim: &Claim) -> bool {
        self.claim_type.is_none_or(|t| claim.claim_type == t)
            && self.subject_id.as_deref().is_none_or(|s| claim.subject.id == s)
            && self.status.is_none_or(|s| claim.status == s)
            && self.min_strength.is_none_or(|m| claim.signal_strength.overall >= m)
    }
}

/// Query criteria for retrieving edges
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeFilter {
    /// Filter by edge type
    pub edge_type: Option<EdgeType>,

    /// Filter by minimum strength
    pub min_strength: Option<f64>,
}

/// Query criteria for retrieving defeaters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefeaterFilter {
    /// Filter by severity
    pub severity: Option<DefeaterSeverity>,

    /// Filter by lifecycle status
    pub status: Option<DefeaterStatus>,

    /// Filter by defeater type
    pub defeater_type: Option<DefeaterType>,
}

/// Query criteria for retrieving contradictions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContradictionFilter {
    /// Filter by severity
    pub severity: Option<ContradictionSeverity>,

    /// Filter by lifecycle status
    pub status: Option<ContradictionStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClaimSource, ClaimSubject, SourceKind, SubjectKind};

    #[test]
    fn test_claim_filter_matches() {
        let claim = Claim::new(
            "c1".into(),
            "parse_config reads TOML",
            ClaimType::Behavioral,
            ClaimSubject::new(SubjectKind::Function, "config::parse", "parse_config"),
            ClaimSource::new(SourceKind::Llm, "gpt"),
            SignalStrength::uniform(0.6),
            0,
        );

        assert!(ClaimFilter::default().matches(&claim));
        assert!(ClaimFilter::for_subject("config::parse").matches(&claim));
        assert!(!ClaimFilter::for_subject("other").matches(&claim));
        assert!(!ClaimFilter::with_status(ClaimStatus::Stale).matches(&claim));

        let strong = ClaimFilter {
            min_strength: Some(0.7),
            ..Default::default()
        };
        assert!(!strong.matches(&claim));
    }
}

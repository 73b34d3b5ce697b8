//! Whole-graph aggregate, statistics and the health formula

use crate::traversal::{breadth_first, shortest_path};
use crate::{Claim, ClaimId, ClaimStatus, EvidenceEdge, TraversalResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;

/// Penalty per active defeater, before the cap
pub const DEFEATER_PENALTY_PER_ITEM: f64 = 0.03;

/// Penalty per unresolved contradiction, before the cap
pub const CONTRADICTION_PENALTY_PER_ITEM: f64 = 0.05;

/// Cap on each penalty term
pub const PENALTY_CAP: f64 = 0.3;

/// Aggregate statistics over the stored graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Total claims
    pub claim_count: usize,
    /// Total edges
    pub edge_count: usize,
    /// Defeaters in the active state
    pub active_defeater_count: usize,
    /// Contradictions awaiting resolution
    pub unresolved_contradiction_count: usize,
    /// Mean overall signal strength across all claims (0 when empty)
    pub mean_signal_strength: f64,
    /// Claims in the active state
    pub active_claim_count: usize,
    /// Claims in the stale state
    pub stale_claim_count: usize,
    /// Claims in the defeated state
    pub defeated_claim_count: usize,
    /// Claims in the contradicted state
    pub contradicted_claim_count: usize,
}

impl GraphStats {
    /// Share of active claims among active, stale and defeated claims
    ///
    /// Contradicted claims are tracked by the contradiction penalty instead.
    /// An empty denominator counts as fully healthy.
    pub fn healthy_claim_ratio(&self) -> f64 {
        let denominator = self.active_claim_count + self.stale_claim_count + self.defeated_claim_count;
        if denominator == 0 {
            return 1.0;
        }
        self.active_claim_count as f64 / denominator as f64
    }

    /// `min(0.3, active defeaters × 0.03)`
    pub fn defeater_penalty(&self) -> f64 {
        (self.active_defeater_count as f64 * DEFEATER_PENALTY_PER_ITEM).min(PENALTY_CAP)
    }

    /// `min(0.3, unresolved contradictions × 0.05)`
    pub fn contradiction_penalty(&self) -> f64 {
        (self.unresolved_contradiction_count as f64 * CONTRADICTION_PENALTY_PER_ITEM).min(PENALTY_CAP)
    }
}

/// Health score in [0, 1]: healthy ratio minus capped penalties
///
/// A graph with no claims and no open issues scores exactly 1.0.
pub fn health_score(stats: &GraphStats) -> f64 {
    (stats.healthy_claim_ratio() - stats.defeater_penalty() - stats.contradiction_penalty()).clamp(0.0, 1.0)
}

/// Snapshot metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMeta {
    /// Number of claims in the snapshot
    pub claim_count: usize,
    /// Number of edges in the snapshot
    pub edge_count: usize,
    /// Health score at export time
    pub health: f64,
    /// When the snapshot was taken (ms since epoch)
    pub exported_at: u64,
}

/// The full set of claims and edges, used for snapshot export/import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceGraph {
    /// Claims keyed by id
    pub claims: BTreeMap<ClaimId, Claim>,
    /// Edges between claims in the snapshot
    pub edges: Vec<EvidenceEdge>,
    /// Snapshot metadata
    pub meta: GraphMeta,
}

impl EvidenceGraph {
    /// Build a snapshot from claims and edges
    ///
    /// Edges with an endpoint outside `claims` are dropped so the snapshot is
    /// always referentially closed.
    pub fn new(claims: Vec<Claim>, edges: Vec<EvidenceEdge>, health: f64, exported_at: u64) -> Self {
        let claims: BTreeMap<ClaimId, Claim> = claims.into_iter().map(|c| (c.id.clone(), c)).collect();
        let edges: Vec<EvidenceEdge> = edges
            .into_iter()
            .filter(|e| claims.contains_key(&e.from_claim_id) && claims.contains_key(&e.to_claim_id))
            .collect();
        let meta = GraphMeta {
            claim_count: claims.len(),
            edge_count: edges.len(),
            health,
            exported_at,
        };
        Self { claims, edges, meta }
    }

    /// Outgoing edges of a claim
    pub fn edges_from(&self, id: &ClaimId) -> Vec<EvidenceEdge> {
        self.edges.iter().filter(|e| &e.from_claim_id == id).cloned().collect()
    }

    /// Number of claims with the given status
    pub fn count_status(&self, status: ClaimStatus) -> usize {
        self.claims.values().filter(|c| c.status == status).count()
    }

    /// Breadth-first traversal within the snapshot (`max_depth == 0` is unlimited)
    pub fn traverse_from(&self, start: &ClaimId, max_depth: usize) -> TraversalResult {
        if !self.claims.contains_key(start) {
            return TraversalResult::default();
        }
        let reach = match breadth_first::<Infallible, _>(start, max_depth, |id| Ok(self.edges_from(id))) {
            Ok(reach) => reach,
            Err(never) => match never {},
        };
        TraversalResult {
            claims: reach.visited.iter().filter_map(|id| self.claims.get(id).cloned()).collect(),
            edges: reach.edges,
            depth_reached: reach.depth_reached,
        }
    }

    /// Shortest directed path within the snapshot
    pub fn find_path(&self, from: &ClaimId, to: &ClaimId) -> Vec<EvidenceEdge> {
        match shortest_path::<Infallible, _>(from, to, |id| Ok(self.edges_from(id))) {
            Ok(path) => path,
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClaimSource, ClaimSubject, ClaimType, EdgeType, SignalStrength, SourceKind, SubjectKind};

    fn claim(id: &str, status: ClaimStatus) -> Claim {
        Claim::new(
            id.into(),
            format!("proposition {}", id),
            ClaimType::Semantic,
            ClaimSubject::new(SubjectKind::Function, format!("fn:{}", id), id),
            ClaimSource::new(SourceKind::StaticAnalysis, "analyzer"),
            SignalStrength::uniform(0.6),
            0,
        )
        .with_status(status)
    }

    #[test]
    fn test_empty_graph_health_is_one() {
        assert_eq!(health_score(&GraphStats::default()), 1.0);
    }

    #[test]
    fn test_health_formula() {
        let stats = GraphStats {
            active_claim_count: 6,
            stale_claim_count: 2,
            defeated_claim_count: 2,
            active_defeater_count: 2,
            unresolved_contradiction_count: 1,
            ..Default::default()
        };
        // 0.6 - 0.06 - 0.05
        assert!((health_score(&stats) - 0.49).abs() < 1e-9);
    }

    #[test]
    fn test_penalties_are_capped() {
        let stats = GraphStats {
            active_claim_count: 1,
            active_defeater_count: 100,
            unresolved_contradiction_count: 100,
            ..Default::default()
        };
        assert_eq!(stats.defeater_penalty(), 0.3);
        assert_eq!(stats.contradiction_penalty(), 0.3);
        assert!((health_score(&stats) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_health_never_negative() {
        let stats = GraphStats {
            defeated_claim_count: 10,
            active_defeater_count: 50,
            unresolved_contradiction_count: 50,
            ..Default::default()
        };
        assert_eq!(health_score(&stats), 0.0);
    }

    #[test]
    fn test_snapshot_drops_dangling_edges() {
        let graph = EvidenceGraph::new(
            vec![claim("A", ClaimStatus::Active), claim("B", ClaimStatus::Stale)],
            vec![
                EvidenceEdge::new("A".into(), "B".into(), EdgeType::Supports, 0.9, 0),
                EvidenceEdge::new("A".into(), "Z".into(), EdgeType::Supports, 0.9, 0),
            ],
            1.0,
            0,
        );
        assert_eq!(graph.meta.claim_count, 2);
        assert_eq!(graph.meta.edge_count, 1);
        assert_eq!(graph.count_status(ClaimStatus::Stale), 1);
    }

    #[test]
    fn test_in_memory_traversal_and_path() {
        let graph = EvidenceGraph::new(
            vec![
                claim("A", ClaimStatus::Active),
                claim("B", ClaimStatus::Active),
                claim("C", ClaimStatus::Active),
                claim("D", ClaimStatus::Active),
            ],
            vec![
                EvidenceEdge::new("A".into(), "B".into(), EdgeType::Supports, 0.9, 0),
                EvidenceEdge::new("B".into(), "C".into(), EdgeType::Supports, 0.9, 0),
                EvidenceEdge::new("A".into(), "D".into(), EdgeType::Supports, 0.9, 0),
            ],
            1.0,
            0,
        );

        let result = graph.traverse_from(&"A".into(), 1);
        assert_eq!(result.claims.len(), 3);
        assert!(result.claims.iter().all(|c| c.id.as_str() != "C"));

        assert_eq!(graph.find_path(&"A".into(), &"C".into()).len(), 2);
        assert!(graph.find_path(&"C".into(), &"A".into()).is_empty());
        assert!(graph.traverse_from(&"Q".into(), 0).claims.is_empty());
    }
}

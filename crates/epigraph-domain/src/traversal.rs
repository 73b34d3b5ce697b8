//! Breadth-first traversal over evidence edges
//!
//! The edge set is not guaranteed to be acyclic, so every walk tracks a
//! visited set instead of recursing. Outgoing edges are supplied by a lookup
//! closure, which lets the same algorithm run over a database or an
//! in-memory [`crate::EvidenceGraph`].

use crate::{Claim, ClaimId, EvidenceEdge};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Claims and edges reachable from a starting claim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraversalResult {
    /// Reachable claims in breadth-first order, starting claim first
    pub claims: Vec<Claim>,
    /// Every edge followed during the walk
    pub edges: Vec<EvidenceEdge>,
    /// Largest hop distance of any visited claim
    pub depth_reached: usize,
}

/// Claim ids reachable from a start, before claims are loaded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reachability {
    /// Visited ids in breadth-first order, start first
    pub visited: Vec<ClaimId>,
    /// Every edge followed during the walk
    pub edges: Vec<EvidenceEdge>,
    /// Largest hop distance of any visited claim
    pub depth_reached: usize,
}

/// Breadth-first expansion along outgoing edges
///
/// Claims reachable in at most `max_depth` hops are visited; `max_depth == 0`
/// means unlimited. Edges leaving a claim are only followed when that claim
/// sits strictly inside the depth limit, so a claim first reachable at hop
/// `max_depth + 1` is never visited.
pub fn breadth_first<E, F>(start: &ClaimId, max_depth: usize, mut outgoing: F) -> Result<Reachability, E>
where
    F: FnMut(&ClaimId) -> Result<Vec<EvidenceEdge>, E>,
{
    let limit = if max_depth == 0 { usize::MAX } else { max_depth };

    let mut seen: HashSet<ClaimId> = HashSet::new();
    let mut queue: VecDeque<(ClaimId, usize)> = VecDeque::new();
    let mut result = Reachability::default();

    seen.insert(start.clone());
    queue.push_back((start.clone(), 0));

    while let Some((current, depth)) = queue.pop_front() {
        result.depth_reached = result.depth_reached.max(depth);
        result.visited.push(current.clone());

        if depth >= limit {
            continue;
        }

        for edge in outgoing(&current)? {
            if seen.insert(edge.to_claim_id.clone()) {
                queue.push_back((edge.to_claim_id.clone(), depth + 1));
            }
            result.edges.push(edge);
        }
    }

    Ok(result)
}

/// Shortest directed path from `from` to `to` as an ordered edge list
///
/// Returns an empty list when `to` is unreachable or when `from == to`.
pub fn shortest_path<E, F>(from: &ClaimId, to: &ClaimId, mut outgoing: F) -> Result<Vec<EvidenceEdge>, E>
where
    F: FnMut(&ClaimId) -> Result<Vec<EvidenceEdge>, E>,
{
    if from == to {
        return Ok(Vec::new());
    }

    // Edge by which each claim was first reached
    let mut parent: HashMap<ClaimId, EvidenceEdge> = HashMap::new();
    let mut seen: HashSet<ClaimId> = HashSet::new();
    let mut queue: VecDeque<ClaimId> = VecDeque::new();

    seen.insert(from.clone());
    queue.push_back(from.clone());

    while let Some(current) = queue.pop_front() {
        for edge in outgoing(&current)? {
            let next = edge.to_claim_id.clone();
            if !seen.insert(next.clone()) {
                continue;
            }
            parent.insert(next.clone(), edge);

            if &next == to {
                return Ok(unwind(parent, from, to));
            }
            queue.push_back(next);
        }
    }

    Ok(Vec::new())
}

fn unwind(mut parent: HashMap<ClaimId, EvidenceEdge>, from: &ClaimId, to: &ClaimId) -> Vec<EvidenceEdge> {
    let mut path = Vec::new();
    let mut cursor = to.clone();
    while &cursor != from {
        match parent.remove(&cursor) {
            Some(edge) => {
                cursor = edge.from_claim_id.clone();
                path.push(edge);
            }
            None => break,
        }
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EdgeType;
    use std::convert::Infallible;

    fn edge(from: &str, to: &str) -> EvidenceEdge {
        EvidenceEdge::new(from.into(), to.into(), EdgeType::Supports, 1.0, 0).with_id(format!("{}->{}", from, to))
    }

    fn lookup(edges: &[EvidenceEdge]) -> impl FnMut(&ClaimId) -> Result<Vec<EvidenceEdge>, Infallible> + '_ {
        move |id| Ok(edges.iter().filter(|e| &e.from_claim_id == id).cloned().collect())
    }

    fn ids(r: &Reachability) -> Vec<&str> {
        r.visited.iter().map(|id| id.as_str()).collect()
    }

    #[test]
    fn test_depth_one_excludes_second_hop() {
        let edges = vec![edge("A", "B"), edge("B", "C"), edge("A", "D")];
        let r = breadth_first(&"A".into(), 1, lookup(&edges)).unwrap();

        assert_eq!(ids(&r), vec!["A", "B", "D"]);
        assert_eq!(r.depth_reached, 1);
        assert_eq!(r.edges.len(), 2);
    }

    #[test]
    fn test_unlimited_depth() {
        let edges = vec![edge("A", "B"), edge("B", "C"), edge("C", "D")];
        let r = breadth_first(&"A".into(), 0, lookup(&edges)).unwrap();

        assert_eq!(ids(&r), vec!["A", "B", "C", "D"]);
        assert_eq!(r.depth_reached, 3);
    }

    #[test]
    fn test_cycle_terminates() {
        let edges = vec![edge("A", "B"), edge("B", "C"), edge("C", "A")];
        let r = breadth_first(&"A".into(), 0, lookup(&edges)).unwrap();

        assert_eq!(ids(&r), vec!["A", "B", "C"]);
        assert_eq!(r.edges.len(), 3);
    }

    #[test]
    fn test_shortest_path() {
        let edges = vec![edge("A", "B"), edge("B", "C"), edge("A", "D")];

        let path = shortest_path(&"A".into(), &"C".into(), lookup(&edges)).unwrap();
        let hops: Vec<&str> = path.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(hops, vec!["A->B", "B->C"]);

        let back = shortest_path(&"C".into(), &"A".into(), lookup(&edges)).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_shortest_path_prefers_fewer_hops() {
        let edges = vec![edge("A", "B"), edge("B", "C"), edge("C", "E"), edge("A", "E")];
        let path = shortest_path(&"A".into(), &"E".into(), lookup(&edges)).unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].id.as_str(), "A->E");
    }

    #[test]
    fn test_shortest_path_through_cycle() {
        let edges = vec![edge("A", "B"), edge("B", "A"), edge("B", "C")];
        let path = shortest_path(&"A".into(), &"C".into(), lookup(&edges)).unwrap();
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_lookup_errors_propagate() {
        let result: Result<Reachability, String> =
            breadth_first(&"A".into(), 0, |_| Err("disk on fire".to_string()));
        assert_eq!(result.unwrap_err(), "disk on fire");
    }
}

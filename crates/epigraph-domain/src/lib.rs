//! Epigraph Domain Layer
//!
//! This crate contains the core data model for Epigraph: a codebase's knowledge
//! held as an auditable graph of defeasible claims. It defines the value objects,
//! the pure scoring functions, and the trait interface that the storage and
//! defeater layers depend upon.
//!
//! ## Key Concepts
//!
//! - **Claim**: An atomic assertion about a code entity, never a fact
//! - **Signal Strength**: Five independent evidence components plus a derived overall
//! - **Evidence Edge**: A directed support/opposition relation between claims
//! - **Defeater**: A detected reason to weaken or retract claims
//! - **Contradiction**: Two claims that cannot both hold about one subject
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture:
//! - Minimal external dependencies (ids and serialization only)
//! - Pure business logic only
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

mod ids;

pub mod calibration;
pub mod claim;
pub mod confidence_computation;
pub mod contradiction;
pub mod defeater;
pub mod edge;
pub mod graph;
pub mod signal;
pub mod traits;
pub mod traversal;

// Re-exports for convenience
pub use calibration::{CalibrationBucket, CalibrationReport, PredictionOutcome};
pub use claim::{Claim, ClaimId, ClaimSource, ClaimStatus, ClaimSubject, ClaimType, SourceKind, SubjectKind, SubjectLocation};
pub use confidence_computation::{
    compute_confidence, ConfidenceResult, ConfidenceSignals, CrossValidationSignals, HistoricalSignals,
    SemanticSignals, StructuralSignals,
};
pub use contradiction::{
    Contradiction, ContradictionId, ContradictionResolution, ContradictionSeverity,
    ContradictionStatus, ContradictionType, ResolutionMethod,
};
pub use defeater::{DefeaterId, DefeaterSeverity, DefeaterStatus, DefeaterType, ExtendedDefeater, Remediation};
pub use edge::{EdgeId, EdgeType, EvidenceEdge};
pub use graph::{health_score, EvidenceGraph, GraphMeta, GraphStats};
pub use signal::{SignalComponent, SignalStrength};
pub use traits::{ClaimFilter, ContradictionFilter, DefeaterFilter, EdgeFilter, EvidenceStore};
pub use traversal::TraversalResult;

/// Current time in milliseconds since the Unix epoch
///
/// Returns 0 if the system clock is set before the epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

//! Defeater and contradiction resolution

use crate::DefeaterError;
use epigraph_domain::{
    ClaimId, ClaimStatus, ContradictionId, ContradictionResolution, ContradictionStatus, DefeaterId,
    DefeaterSeverity, DefeaterStatus, EvidenceStore, ExtendedDefeater, Remediation,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::{debug, info};

/// A remediation step proposed for an active defeater
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionAction {
    /// The defeater to remediate
    pub defeater: ExtendedDefeater,
    /// What to do
    pub action: Remediation,
    /// Higher runs first
    pub priority: u32,
}

/// Result of resolving a defeater or contradiction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    /// Whether the record changed state (false if it was already resolved)
    pub transitioned: bool,
    /// Claims moved back to stale
    pub restored_claims: Vec<ClaimId>,
}

/// Priority of remediating a defeater
pub fn resolution_priority(defeater: &ExtendedDefeater) -> u32 {
    let base = match defeater.severity {
        DefeaterSeverity::Full => 90,
        DefeaterSeverity::Partial => 60,
        DefeaterSeverity::Warning => 30,
    };
    if defeater.auto_resolvable {
        base + 5
    } else {
        base
    }
}

/// Resolve a defeater and restore the claims it alone was holding down
///
/// A covered claim that is `defeated` moves back to `stale` only when no
/// other active defeater still covers it.
pub fn resolve_defeater<S>(store: &mut S, id: &DefeaterId) -> Result<ResolutionOutcome, DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    let defeater = store
        .get_defeater(id)
        .map_err(DefeaterError::store)?
        .ok_or_else(|| DefeaterError::NotFound(format!("defeater {}", id)))?;

    let mut outcome = ResolutionOutcome {
        transitioned: store.resolve_defeater(id).map_err(DefeaterError::store)?,
        ..Default::default()
    };
    if !outcome.transitioned {
        debug!(defeater = %id, "Defeater already resolved");
        return Ok(outcome);
    }

    for claim_id in &defeater.affected_claim_ids {
        let Some(claim) = store.get_claim(claim_id).map_err(DefeaterError::store)? else {
            continue;
        };
        if claim.status != ClaimStatus::Defeated {
            continue;
        }
        let still_defeated = store
            .get_defeaters_for_claim(claim_id)
            .map_err(DefeaterError::store)?
            .iter()
            .any(|d| d.id != *id && d.status == DefeaterStatus::Active);
        if still_defeated {
            continue;
        }
        store
            .update_claim_status(claim_id, ClaimStatus::Stale)
            .map_err(DefeaterError::store)?;
        outcome.restored_claims.push(claim_id.clone());
    }

    info!(defeater = %id, restored = outcome.restored_claims.len(), "Defeater resolved");
    Ok(outcome)
}

/// Remediation plan for every active defeater, highest priority first
///
/// Ties keep detection order.
pub fn plan_resolutions<S>(store: &S) -> Result<Vec<ResolutionAction>, DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    let mut plan: Vec<ResolutionAction> = store
        .get_active_defeaters()
        .map_err(DefeaterError::store)?
        .into_iter()
        .map(|defeater| ResolutionAction {
            action: defeater.remediation(),
            priority: resolution_priority(&defeater),
            defeater,
        })
        .collect();
    plan.sort_by(|a, b| b.priority.cmp(&a.priority));
    Ok(plan)
}

/// Resolve a contradiction and restore claims it no longer holds down
///
/// A `contradicted` endpoint moves to `stale` once no unresolved
/// contradiction touches it.
pub fn resolve_contradiction<S>(
    store: &mut S,
    id: &ContradictionId,
    resolution: Option<ContradictionResolution>,
) -> Result<ResolutionOutcome, DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    let resolution = resolution.ok_or(DefeaterError::ResolutionRequired)?;
    let contradiction = store
        .get_contradiction(id)
        .map_err(DefeaterError::store)?
        .ok_or_else(|| DefeaterError::NotFound(format!("contradiction {}", id)))?;

    let mut outcome = ResolutionOutcome::default();
    if contradiction.status == ContradictionStatus::Resolved {
        return Ok(outcome);
    }
    store
        .resolve_contradiction(id, Some(resolution))
        .map_err(DefeaterError::store)?;
    outcome.transitioned = true;

    for claim_id in [&contradiction.claim_a, &contradiction.claim_b] {
        let Some(claim) = store.get_claim(claim_id).map_err(DefeaterError::store)? else {
            continue;
        };
        if claim.status != ClaimStatus::Contradicted {
            continue;
        }
        let open = store
            .get_contradictions_for_claim(claim_id)
            .map_err(DefeaterError::store)?
            .iter()
            .any(|c| c.status == ContradictionStatus::Unresolved);
        if open {
            continue;
        }
        store
            .update_claim_status(claim_id, ClaimStatus::Stale)
            .map_err(DefeaterError::store)?;
        outcome.restored_claims.push(claim_id.clone());
    }

    info!(contradiction = %id, restored = outcome.restored_claims.len(), "Contradiction resolved");
    Ok(outcome)
}

/// Resolve every active auto-resolvable defeater
pub fn resolve_auto_resolvable<S>(store: &mut S) -> Result<Vec<(DefeaterId, ResolutionOutcome)>, DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    let ids: Vec<DefeaterId> = store
        .get_active_defeaters()
        .map_err(DefeaterError::store)?
        .into_iter()
        .filter(|d| d.auto_resolvable)
        .map(|d| d.id)
        .collect();

    let mut resolved = Vec::with_capacity(ids.len());
    for id in ids {
        let outcome = resolve_defeater(store, &id)?;
        resolved.push((id, outcome));
    }
    Ok(resolved)
}

//! Defeater application
//!
//! Persists detected defeaters and contradictions, activates defeaters and
//! weakens the claims they cover. Application is not atomic: each item either
//! lands or is reported in [`ApplicationResult::failures`].

use crate::{DefeaterConfig, DefeaterError, DetectionResult};
use epigraph_domain::{
    Claim, ClaimId, ClaimStatus, ContradictionId, DefeaterId, DefeaterSeverity, DefeaterStatus, DefeaterType,
    EvidenceStore, ExtendedDefeater,
};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use tracing::{debug, info, warn};

/// The item an application failure refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum FailedItem {
    /// A claim could not be updated
    Claim(ClaimId),
    /// A defeater could not be persisted or activated
    Defeater(DefeaterId),
    /// A contradiction could not be persisted
    Contradiction(ContradictionId),
}

impl Display for FailedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailedItem::Claim(id) => write!(f, "claim {}", id),
            FailedItem::Defeater(id) => write!(f, "defeater {}", id),
            FailedItem::Contradiction(id) => write!(f, "contradiction {}", id),
        }
    }
}

/// One item that failed to apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFailure {
    /// What failed
    pub item: FailedItem,
    /// Why
    pub reason: String,
}

/// Output of an application pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationResult {
    /// Claims whose strength or status changed, in first-touch order
    pub updated_claims: Vec<ClaimId>,
    /// Claims that ended the pass defeated
    pub defeated_claims: Vec<ClaimId>,
    /// Defeaters moved from pending to active
    pub activated_defeaters: Vec<DefeaterId>,
    /// Older staleness defeaters superseded by a fresh measurement
    pub resolved_defeaters: Vec<DefeaterId>,
    /// Contradictions persisted
    pub recorded_contradictions: Vec<ContradictionId>,
    /// Defeaters beyond the batch cap, to apply in a later cycle
    pub deferred: Vec<ExtendedDefeater>,
    /// Items that failed to apply
    pub failures: Vec<ApplicationFailure>,
}

impl ApplicationResult {
    fn touch(&mut self, id: &ClaimId) {
        if !self.updated_claims.contains(id) {
            self.updated_claims.push(id.clone());
        }
    }

    fn fail(&mut self, item: FailedItem, reason: impl Display) {
        warn!(item = %item, reason = %reason, "Failed to apply");
        self.failures.push(ApplicationFailure {
            item,
            reason: reason.to_string(),
        });
    }
}

/// Status a claim moves to after a defeater has weakened it
pub(crate) fn next_status(
    current: ClaimStatus,
    defeater: &ExtendedDefeater,
    overall: f64,
    config: &DefeaterConfig,
) -> ClaimStatus {
    if !current.is_live() {
        return current;
    }
    if defeater.severity == DefeaterSeverity::Full || overall < config.defeat_threshold {
        ClaimStatus::Defeated
    } else if defeater.defeater_type == DefeaterType::Staleness {
        ClaimStatus::Stale
    } else {
        current
    }
}

/// Lower each implicated component of `claim` by `reduction × weight`
pub fn apply_reduction(claim: &mut Claim, defeater: &ExtendedDefeater) {
    for (component, weight) in defeater.defeater_type.reduction_profile() {
        claim
            .signal_strength
            .reduce(*component, defeater.confidence_reduction * weight);
    }
}

/// Persist and apply a detection result
///
/// At most `max_batch_size` defeaters are handled; the rest come back in
/// [`ApplicationResult::deferred`]. A defeater already stored in a non-pending
/// state is skipped, so applying the same result twice changes nothing.
pub fn apply_defeaters<S>(store: &mut S, detection: DetectionResult, config: &DefeaterConfig) -> ApplicationResult
where
    S: EvidenceStore,
    S::Error: Display,
{
    let mut result = ApplicationResult::default();
    let mut defeaters = detection.defeaters;
    if defeaters.len() > config.max_batch_size {
        result.deferred = defeaters.split_off(config.max_batch_size);
        info!(deferred = result.deferred.len(), "Batch cap reached, deferring defeaters");
    }

    for defeater in &defeaters {
        apply_one(store, defeater, config, &mut result);
    }

    for contradiction in &detection.contradictions {
        if let Err(e) = store.upsert_contradiction(contradiction) {
            result.fail(FailedItem::Contradiction(contradiction.id.clone()), e);
            continue;
        }
        result.recorded_contradictions.push(contradiction.id.clone());

        for claim_id in [&contradiction.claim_a, &contradiction.claim_b] {
            match mark_contradicted(store, claim_id) {
                Ok(true) => result.touch(claim_id),
                Ok(false) => {}
                Err(e) => result.fail(FailedItem::Claim(claim_id.clone()), e),
            }
        }
    }

    debug!(
        activated = result.activated_defeaters.len(),
        updated = result.updated_claims.len(),
        failures = result.failures.len(),
        "Application pass complete"
    );
    result
}

fn apply_one<S>(store: &mut S, defeater: &ExtendedDefeater, config: &DefeaterConfig, result: &mut ApplicationResult)
where
    S: EvidenceStore,
    S::Error: Display,
{
    let item = || FailedItem::Defeater(defeater.id.clone());

    match store.get_defeater(&defeater.id) {
        Ok(Some(stored)) if stored.status != DefeaterStatus::Pending => {
            debug!(defeater = %defeater.id, "Defeater already applied, skipping");
            return;
        }
        Ok(Some(_)) => {}
        Ok(None) => {
            if let Err(e) = store.upsert_defeater(defeater) {
                result.fail(item(), e);
                return;
            }
        }
        Err(e) => {
            result.fail(item(), e);
            return;
        }
    }

    if !config.auto_activate {
        return;
    }
    match store.activate_defeater(&defeater.id) {
        Ok(true) => result.activated_defeaters.push(defeater.id.clone()),
        Ok(false) => return,
        Err(e) => {
            result.fail(item(), e);
            return;
        }
    }

    if defeater.defeater_type == DefeaterType::Staleness {
        if let Err(e) = supersede_staleness(store, defeater, result) {
            result.fail(item(), e);
        }
    }

    for claim_id in &defeater.affected_claim_ids {
        match weaken_claim(store, claim_id, defeater, config) {
            Ok(status) => {
                result.touch(claim_id);
                if status == ClaimStatus::Defeated && !result.defeated_claims.contains(claim_id) {
                    result.defeated_claims.push(claim_id.clone());
                }
            }
            Err(e) => result.fail(FailedItem::Claim(claim_id.clone()), e),
        }
    }
}

fn weaken_claim<S>(
    store: &mut S,
    claim_id: &ClaimId,
    defeater: &ExtendedDefeater,
    config: &DefeaterConfig,
) -> Result<ClaimStatus, DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    let mut claim = store
        .get_claim(claim_id)
        .map_err(DefeaterError::store)?
        .ok_or_else(|| DefeaterError::NotFound(format!("claim {}", claim_id)))?;

    apply_reduction(&mut claim, defeater);
    store
        .update_claim_signal_strength(claim_id, &claim.signal_strength)
        .map_err(DefeaterError::store)?;

    let next = next_status(claim.status, defeater, claim.signal_strength.overall, config);
    if next != claim.status {
        store
            .update_claim_status(claim_id, next)
            .map_err(DefeaterError::store)?;
        debug!(claim = %claim_id, from = claim.status.as_str(), to = next.as_str(), "Claim status changed");
    }
    Ok(next)
}

/// Resolve older active staleness defeaters on the claims a fresh one covers
fn supersede_staleness<S>(
    store: &mut S,
    defeater: &ExtendedDefeater,
    result: &mut ApplicationResult,
) -> Result<(), DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    for claim_id in &defeater.affected_claim_ids {
        let older: Vec<DefeaterId> = store
            .get_defeaters_for_claim(claim_id)
            .map_err(DefeaterError::store)?
            .into_iter()
            .filter(|d| {
                d.id != defeater.id && d.defeater_type == DefeaterType::Staleness && d.status == DefeaterStatus::Active
            })
            .map(|d| d.id)
            .collect();
        for id in older {
            if store.resolve_defeater(&id).map_err(DefeaterError::store)? {
                result.resolved_defeaters.push(id);
            }
        }
    }
    Ok(())
}

fn mark_contradicted<S>(store: &mut S, claim_id: &ClaimId) -> Result<bool, DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    let claim = store
        .get_claim(claim_id)
        .map_err(DefeaterError::store)?
        .ok_or_else(|| DefeaterError::NotFound(format!("claim {}", claim_id)))?;
    if !claim.status.is_live() {
        return Ok(false);
    }
    store
        .update_claim_status(claim_id, ClaimStatus::Contradicted)
        .map_err(DefeaterError::store)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{claim, seed, store, NOW};
    use crate::{detect_defeaters, DetectionContext};
    use epigraph_domain::{
        Contradiction, ContradictionSeverity, ContradictionType, EvidenceStore, SignalStrength,
    };

    fn defeater(id: &str, t: DefeaterType, severity: DefeaterSeverity, claims: &[&str], reduction: f64) -> ExtendedDefeater {
        ExtendedDefeater::new(t, severity, claims.iter().map(|c| ClaimId::from(*c)).collect(), reduction, "test", NOW)
            .with_id(id)
    }

    fn detection(defeaters: Vec<ExtendedDefeater>) -> DetectionResult {
        DetectionResult {
            defeaters,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_severity_defeats_strong_claim() {
        let mut s = store();
        let mut strong = claim("c1", "fn:a", "src/a.rs");
        strong.signal_strength = SignalStrength::uniform(1.0);
        seed(&mut s, &[strong]);

        let result = apply_defeaters(
            &mut s,
            detection(vec![defeater("d1", DefeaterType::Staleness, DefeaterSeverity::Full, &["c1"], 0.05)]),
            &DefeaterConfig::default(),
        );

        assert_eq!(result.activated_defeaters, vec![DefeaterId::from("d1")]);
        assert_eq!(result.defeated_claims, vec![ClaimId::from("c1")]);
        let c1 = s.get_claim(&"c1".into()).unwrap().unwrap();
        assert_eq!(c1.status, ClaimStatus::Defeated);
        assert!(c1.signal_strength.overall > 0.9);
    }

    #[test]
    fn test_reduction_profile_applied() {
        let mut s = store();
        seed(&mut s, &[claim("c1", "fn:a", "src/a.rs")]);

        apply_defeaters(
            &mut s,
            detection(vec![defeater("d1", DefeaterType::ProviderUnavailable, DefeaterSeverity::Warning, &["c1"], 0.2)]),
            &DefeaterConfig::default(),
        );

        let c1 = s.get_claim(&"c1".into()).unwrap().unwrap();
        assert!((c1.signal_strength.retrieval - 0.7).abs() < 1e-9);
        assert!((c1.signal_strength.semantic - 0.7).abs() < 1e-9);
        assert!((c1.signal_strength.structural - 0.8).abs() < 1e-9);
        assert!((c1.signal_strength.overall - 0.76).abs() < 1e-9);
        assert_eq!(c1.status, ClaimStatus::Active);
    }

    #[test]
    fn test_low_overall_defeats() {
        let mut s = store();
        let mut weak = claim("c1", "fn:a", "src/a.rs");
        weak.signal_strength = SignalStrength::uniform(0.3);
        seed(&mut s, &[weak]);

        let result = apply_defeaters(
            &mut s,
            detection(vec![defeater("d1", DefeaterType::CodeChange, DefeaterSeverity::Partial, &["c1"], 0.2)]),
            &DefeaterConfig::default(),
        );
        assert_eq!(result.defeated_claims, vec![ClaimId::from("c1")]);
    }

    #[test]
    fn test_staleness_moves_active_to_stale() {
        let mut s = store();
        seed(&mut s, &[claim("c1", "fn:a", "src/a.rs")]);

        apply_defeaters(
            &mut s,
            detection(vec![defeater("d1", DefeaterType::Staleness, DefeaterSeverity::Warning, &["c1"], 0.1)]),
            &DefeaterConfig::default(),
        );
        let c1 = s.get_claim(&"c1".into()).unwrap().unwrap();
        assert_eq!(c1.status, ClaimStatus::Stale);
        assert!((c1.signal_strength.recency - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_activation_does_not_double_apply() {
        let mut s = store();
        seed(&mut s, &[claim("c1", "fn:a", "src/a.rs")]);
        let batch = detection(vec![defeater("d1", DefeaterType::CodeChange, DefeaterSeverity::Partial, &["c1"], 0.2)]);

        let first = apply_defeaters(&mut s, batch.clone(), &DefeaterConfig::default());
        let after_first = s.get_claim(&"c1".into()).unwrap().unwrap().signal_strength;
        let second = apply_defeaters(&mut s, batch, &DefeaterConfig::default());
        let after_second = s.get_claim(&"c1".into()).unwrap().unwrap().signal_strength;

        assert_eq!(first.activated_defeaters.len(), 1);
        assert!(second.activated_defeaters.is_empty());
        assert!(second.updated_claims.is_empty());
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_batch_cap_defers_remainder() {
        let mut s = store();
        seed(&mut s, &[claim("c1", "fn:a", "src/a.rs")]);
        let config = DefeaterConfig {
            max_batch_size: 2,
            ..Default::default()
        };
        let batch = detection(
            (0..5)
                .map(|i| defeater(&format!("d{}", i), DefeaterType::NewInfo, DefeaterSeverity::Warning, &["c1"], 0.01))
                .collect(),
        );

        let result = apply_defeaters(&mut s, batch, &config);
        assert_eq!(result.activated_defeaters.len(), 2);
        assert_eq!(result.deferred.len(), 3);
        assert_eq!(result.deferred[0].id, DefeaterId::from("d2"));
        assert!(s.get_defeater(&"d4".into()).unwrap().is_none());
    }

    #[test]
    fn test_without_auto_activate_defeaters_stay_pending() {
        let mut s = store();
        seed(&mut s, &[claim("c1", "fn:a", "src/a.rs")]);
        let config = DefeaterConfig {
            auto_activate: false,
            ..Default::default()
        };

        let result = apply_defeaters(
            &mut s,
            detection(vec![defeater("d1", DefeaterType::TestFailure, DefeaterSeverity::Full, &["c1"], 1.0)]),
            &config,
        );
        assert!(result.activated_defeaters.is_empty());
        assert_eq!(s.get_defeater(&"d1".into()).unwrap().unwrap().status, DefeaterStatus::Pending);
        assert_eq!(s.get_claim(&"c1".into()).unwrap().unwrap().status, ClaimStatus::Active);
    }

    #[test]
    fn test_missing_claim_is_a_per_item_failure() {
        let mut s = store();
        seed(&mut s, &[claim("c1", "fn:a", "src/a.rs")]);

        let result = apply_defeaters(
            &mut s,
            detection(vec![
                defeater("bad", DefeaterType::CodeChange, DefeaterSeverity::Partial, &["ghost"], 0.2),
                defeater("good", DefeaterType::CodeChange, DefeaterSeverity::Partial, &["c1"], 0.2),
            ]),
            &DefeaterConfig::default(),
        );
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].item, FailedItem::Defeater("bad".into()));
        assert_eq!(result.activated_defeaters, vec![DefeaterId::from("good")]);
    }

    #[test]
    fn test_contradictions_mark_claims() {
        let mut s = store();
        seed(
            &mut s,
            &[
                claim("a", "fn:a", "src/a.rs"),
                claim("b", "fn:a", "src/a.rs").with_status(ClaimStatus::Defeated),
            ],
        );
        let contradiction = Contradiction::new(
            "a".into(),
            "b".into(),
            ContradictionType::Direct,
            ContradictionSeverity::Blocking,
            "opposite",
            NOW,
        );
        let id = contradiction.id.clone();

        let result = apply_defeaters(
            &mut s,
            DetectionResult {
                contradictions: vec![contradiction],
                ..Default::default()
            },
            &DefeaterConfig::default(),
        );
        assert_eq!(result.recorded_contradictions, vec![id]);
        assert_eq!(result.updated_claims, vec![ClaimId::from("a")]);
        assert_eq!(s.get_claim(&"a".into()).unwrap().unwrap().status, ClaimStatus::Contradicted);
        assert_eq!(s.get_claim(&"b".into()).unwrap().unwrap().status, ClaimStatus::Defeated);
    }

    #[test]
    fn test_fresh_staleness_supersedes_older() {
        let mut s = store();
        seed(&mut s, &[claim("c1", "fn:a", "src/a.rs")]);
        let config = DefeaterConfig::default();

        apply_defeaters(
            &mut s,
            detection(vec![defeater("old", DefeaterType::Staleness, DefeaterSeverity::Warning, &["c1"], 0.1)]),
            &config,
        );
        s.update_claim_status(&"c1".into(), ClaimStatus::Active).unwrap();

        let result = apply_defeaters(
            &mut s,
            detection(vec![defeater("new", DefeaterType::Staleness, DefeaterSeverity::Warning, &["c1"], 0.1)]),
            &config,
        );
        assert_eq!(result.resolved_defeaters, vec![DefeaterId::from("old")]);
        assert_eq!(s.get_defeater(&"old".into()).unwrap().unwrap().status, DefeaterStatus::Resolved);
    }

    #[test]
    fn test_detect_then_apply_code_change() {
        let mut s = store();
        seed(&mut s, &[claim("c1", "fn:a", "src/a.rs"), claim("c2", "fn:b", "src/b.rs")]);
        let ctx = DetectionContext {
            changed_files: vec!["src/a.rs".to_string()],
            ..DetectionContext::at("2023-11-14T22:13:20Z")
        };
        let config = DefeaterConfig::default();

        let found = detect_defeaters(&s, &ctx, &config);
        let result = apply_defeaters(&mut s, found, &config);

        assert_eq!(result.updated_claims, vec![ClaimId::from("c1")]);
        let c1 = s.get_claim(&"c1".into()).unwrap().unwrap();
        assert!((c1.signal_strength.structural - 0.6).abs() < 1e-9);
        assert!((c1.signal_strength.recency - 0.6).abs() < 1e-9);
        assert_eq!(s.get_active_defeaters().unwrap().len(), 1);
    }

    #[test]
    fn test_next_status_leaves_terminal_states() {
        let config = DefeaterConfig::default();
        let full = defeater("d", DefeaterType::TestFailure, DefeaterSeverity::Full, &["c"], 1.0);
        assert_eq!(next_status(ClaimStatus::Contradicted, &full, 0.0, &config), ClaimStatus::Contradicted);
        assert_eq!(next_status(ClaimStatus::Stale, &full, 0.9, &config), ClaimStatus::Defeated);
    }
}

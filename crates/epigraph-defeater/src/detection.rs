//! Defeater detection
//!
//! Detection is read-only: it inspects the store and a [`DetectionContext`]
//! and proposes defeaters and contradictions. Nothing is persisted until the
//! result is handed to [`apply_defeaters`](crate::apply_defeaters).

use crate::{DefeaterConfig, DefeaterError};
use epigraph_domain::{
    now_millis, Claim, ClaimFilter, ClaimId, ClaimStatus, ClaimType, Contradiction, ContradictionSeverity,
    ContradictionStatus, ContradictionType, DefeaterFilter, DefeaterSeverity, DefeaterStatus, DefeaterType, EvidenceStore,
    ExtendedDefeater, Remediation, SourceKind,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use tracing::{debug, warn};

const MAX_STALENESS_REDUCTION: f64 = 0.3;
const STALENESS_REDUCTION_PER_THRESHOLD: f64 = 0.1;
const CODE_CHANGE_REDUCTION: f64 = 0.2;
const PROVIDER_REDUCTION: f64 = 0.1;

const NEGATION_MARKERS: &[&str] = &[
    "not", "no", "never", "none", "nothing", "cannot", "can't", "don't", "doesn't", "isn't", "aren't",
    "won't", "without",
];

/// A claim whose recorded content hash no longer matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashMismatch {
    /// Claim whose subject was hashed
    pub claim_id: ClaimId,
    /// Hash recorded when the claim was made
    pub expected: String,
    /// Hash observed now
    pub actual: String,
}

/// Events that may defeat claims; every field is optional
///
/// An empty list (or an empty provider map) skips the matching detector.
/// Staleness always runs, measured against `timestamp` or the current time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionContext {
    /// Paths of files that changed
    pub changed_files: Vec<String>,
    /// Ids of tests that failed
    pub failed_tests: Vec<String>,
    /// Claims just added to the store, checked for contradictions
    pub new_claims: Vec<Claim>,
    /// Reference time as an RFC 3339 timestamp
    pub timestamp: Option<String>,
    /// Content hash mismatches
    pub hash_mismatches: Vec<HashMismatch>,
    /// Provider name to availability
    pub provider_status: BTreeMap<String, bool>,
}

impl DetectionContext {
    /// Context carrying only a reference time
    pub fn at(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: Some(timestamp.into()),
            ..Default::default()
        }
    }

    /// Reference time in ms since epoch; the current time when unset
    pub fn reference_time(&self) -> Result<u64, DefeaterError> {
        match &self.timestamp {
            None => Ok(now_millis()),
            Some(ts) => {
                let parsed = chrono::DateTime::parse_from_rfc3339(ts)
                    .map_err(|e| DefeaterError::InvalidTimestamp(format!("{}: {}", ts, e)))?;
                u64::try_from(parsed.timestamp_millis())
                    .map_err(|_| DefeaterError::InvalidTimestamp(format!("{} is before the epoch", ts)))
            }
        }
    }
}

/// A detector that failed; the rest of the pass still ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorFailure {
    /// Detector name (`staleness`, `code_change`, ...)
    pub detector: String,
    /// Why it failed
    pub reason: String,
}

/// Output of a detection pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Proposed defeaters, all pending
    pub defeaters: Vec<ExtendedDefeater>,
    /// Proposed contradictions, all unresolved
    pub contradictions: Vec<Contradiction>,
    /// Sorted, de-duplicated claims touched by any proposal
    pub affected_claim_ids: Vec<ClaimId>,
    /// Detectors that failed
    pub errors: Vec<DetectorFailure>,
}

impl DetectionResult {
    /// Whether the pass proposed nothing
    pub fn is_empty(&self) -> bool {
        self.defeaters.is_empty() && self.contradictions.is_empty()
    }

    fn absorb(&mut self, detector: &str, outcome: Result<Vec<ExtendedDefeater>, DefeaterError>) {
        match outcome {
            Ok(found) => {
                debug!(detector, count = found.len(), "Detector finished");
                self.defeaters.extend(found);
            }
            Err(e) => self.fail(detector, e),
        }
    }

    fn fail(&mut self, detector: &str, reason: impl Display) {
        warn!(detector, reason = %reason, "Detector failed");
        self.errors.push(DetectorFailure {
            detector: detector.to_string(),
            reason: reason.to_string(),
        });
    }

    fn collect_affected(&mut self) {
        let ids: BTreeSet<ClaimId> = self
            .defeaters
            .iter()
            .flat_map(|d| d.affected_claim_ids.iter().cloned())
            .chain(
                self.contradictions
                    .iter()
                    .flat_map(|c| [c.claim_a.clone(), c.claim_b.clone()]),
            )
            .collect();
        self.affected_claim_ids = ids.into_iter().collect();
    }
}

/// Run every detector against the store
///
/// Never fails as a whole: a detector that errors is recorded in
/// [`DetectionResult::errors`] and the remaining detectors still run.
pub fn detect_defeaters<S>(store: &S, ctx: &DetectionContext, config: &DefeaterConfig) -> DetectionResult
where
    S: EvidenceStore,
    S::Error: Display,
{
    let mut result = DetectionResult::default();

    let reference_time = ctx.reference_time();
    let detected_at = reference_time.as_ref().copied().unwrap_or_else(|_| now_millis());

    result.absorb(
        "staleness",
        reference_time.and_then(|now| detect_staleness(store, now, config)),
    );

    if !ctx.changed_files.is_empty() {
        result.absorb("code_change", detect_code_changes(store, &ctx.changed_files, detected_at));
    }
    if !ctx.failed_tests.is_empty() {
        result.absorb("test_failure", detect_test_failures(store, &ctx.failed_tests, detected_at));
    }
    for mismatch in &ctx.hash_mismatches {
        let outcome = detect_hash_mismatch(store, mismatch, detected_at).map(|d| vec![d]);
        result.absorb("hash_mismatch", outcome);
    }
    if ctx.provider_status.values().any(|available| !available) {
        result.absorb(
            "provider_unavailable",
            detect_provider_outages(store, &ctx.provider_status, detected_at),
        );
    }
    if !ctx.new_claims.is_empty() {
        match detect_contradictions(store, &ctx.new_claims, detected_at) {
            Ok(found) => {
                for contradiction in found {
                    result.defeaters.push(contradiction_defeater(&contradiction));
                    result.contradictions.push(contradiction);
                }
            }
            Err(e) => result.fail("contradiction", e),
        }
    }

    result.collect_affected();
    debug!(
        defeaters = result.defeaters.len(),
        contradictions = result.contradictions.len(),
        failures = result.errors.len(),
        "Detection pass complete"
    );
    result
}

/// Fail with [`DefeaterError::ProviderUnavailable`] if `name` is reported down
///
/// Providers absent from the map are assumed reachable.
pub fn verify_provider(status: &BTreeMap<String, bool>, name: &str) -> Result<(), DefeaterError> {
    match status.get(name) {
        Some(false) => Err(DefeaterError::ProviderUnavailable {
            provider: name.to_string(),
        }),
        _ => Ok(()),
    }
}

fn store_err(e: impl Display) -> DefeaterError {
    DefeaterError::store(e)
}

fn detect_staleness<S>(store: &S, now: u64, config: &DefeaterConfig) -> Result<Vec<ExtendedDefeater>, DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    let threshold = config.staleness_threshold_ms();
    let claims = store
        .get_claims(&ClaimFilter::with_status(ClaimStatus::Active))
        .map_err(store_err)?;

    let pending: BTreeSet<ClaimId> = store
        .get_defeaters(&DefeaterFilter {
            status: Some(DefeaterStatus::Pending),
            defeater_type: Some(DefeaterType::Staleness),
            ..Default::default()
        })
        .map_err(store_err)?
        .into_iter()
        .flat_map(|d| d.affected_claim_ids)
        .collect();

    let mut found = Vec::new();
    for claim in claims {
        let age = claim.age_ms(now);
        if age <= threshold || pending.contains(&claim.id) {
            continue;
        }

        let ratio = age as f64 / threshold as f64;
        let severity = if age > threshold.saturating_mul(2) {
            DefeaterSeverity::Partial
        } else {
            DefeaterSeverity::Warning
        };
        let reduction = (STALENESS_REDUCTION_PER_THRESHOLD * ratio).min(MAX_STALENESS_REDUCTION);
        found.push(
            ExtendedDefeater::new(
                DefeaterType::Staleness,
                severity,
                vec![claim.id.clone()],
                reduction,
                format!(
                    "Claim is {} days old (threshold {} days)",
                    age / 86_400_000,
                    config.staleness_threshold_days
                ),
                now,
            )
            .auto_resolvable()
            .with_action(Remediation::Revalidate)
            .with_evidence(format!("created_at={}", claim.created_at)),
        );
    }
    Ok(found)
}

fn normalize_path(path: &str) -> &str {
    path.trim_start_matches("./")
}

fn detect_code_changes<S>(store: &S, files: &[String], now: u64) -> Result<Vec<ExtendedDefeater>, DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    let claims = store
        .get_claims(&ClaimFilter::with_status(ClaimStatus::Active))
        .map_err(store_err)?;

    let mut found = Vec::new();
    for file in files {
        let path = normalize_path(file);
        if path.is_empty() {
            continue;
        }
        let affected: Vec<ClaimId> = claims
            .iter()
            .filter(|c| c.subject.file().map(normalize_path) == Some(path) || c.subject.id.contains(path))
            .map(|c| c.id.clone())
            .collect();
        if affected.is_empty() {
            continue;
        }
        found.push(
            ExtendedDefeater::new(
                DefeaterType::CodeChange,
                DefeaterSeverity::Partial,
                affected,
                CODE_CHANGE_REDUCTION,
                format!("{} changed", path),
                now,
            )
            .auto_resolvable()
            .with_action(Remediation::Reindex)
            .with_evidence(path),
        );
    }
    Ok(found)
}

fn undefeated_claims<S>(store: &S) -> Result<Vec<Claim>, DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    Ok(store
        .get_claims(&ClaimFilter::default())
        .map_err(store_err)?
        .into_iter()
        .filter(|c| c.status != ClaimStatus::Defeated)
        .collect())
}

fn detect_test_failures<S>(store: &S, tests: &[String], now: u64) -> Result<Vec<ExtendedDefeater>, DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    let claims = undefeated_claims(store)?;

    let mut found = Vec::new();
    for test in tests {
        let affected: Vec<ClaimId> = claims
            .iter()
            .filter(|c| (c.source.kind == SourceKind::Test && &c.source.id == test) || &c.subject.id == test)
            .map(|c| c.id.clone())
            .collect();
        if affected.is_empty() {
            continue;
        }
        found.push(
            ExtendedDefeater::new(
                DefeaterType::TestFailure,
                DefeaterSeverity::Full,
                affected,
                1.0,
                format!("Test {} failed", test),
                now,
            )
            .with_action(Remediation::RerunTests)
            .with_evidence(test.as_str()),
        );
    }
    Ok(found)
}

fn detect_hash_mismatch<S>(store: &S, mismatch: &HashMismatch, now: u64) -> Result<ExtendedDefeater, DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    if store.get_claim(&mismatch.claim_id).map_err(store_err)?.is_none() {
        return Err(DefeaterError::NotFound(format!("claim {}", mismatch.claim_id)));
    }
    Ok(ExtendedDefeater::new(
        DefeaterType::HashMismatch,
        DefeaterSeverity::Full,
        vec![mismatch.claim_id.clone()],
        1.0,
        format!("Content hash of claim {} no longer matches", mismatch.claim_id),
        now,
    )
    .auto_resolvable()
    .with_action(Remediation::Reindex)
    .with_evidence(format!("expected={} actual={}", mismatch.expected, mismatch.actual)))
}

fn detect_provider_outages<S>(
    store: &S,
    provider_status: &BTreeMap<String, bool>,
    now: u64,
) -> Result<Vec<ExtendedDefeater>, DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    let claims = undefeated_claims(store)?;

    let mut found = Vec::new();
    for provider in provider_status.iter().filter(|(_, up)| !**up).map(|(name, _)| name) {
        let needle = provider.to_lowercase();
        let affected: Vec<ClaimId> = claims
            .iter()
            .filter(|c| c.source.kind == SourceKind::Llm && c.source.id.to_lowercase().contains(&needle))
            .map(|c| c.id.clone())
            .collect();
        if affected.is_empty() {
            continue;
        }
        found.push(
            ExtendedDefeater::new(
                DefeaterType::ProviderUnavailable,
                DefeaterSeverity::Warning,
                affected,
                PROVIDER_REDUCTION,
                format!("Provider {} is unavailable", provider),
                now,
            )
            .auto_resolvable()
            .with_action(Remediation::RetryProvider)
            .with_evidence(provider.as_str()),
        );
    }
    Ok(found)
}

fn detect_contradictions<S>(store: &S, new_claims: &[Claim], now: u64) -> Result<Vec<Contradiction>, DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    let mut found: Vec<Contradiction> = Vec::new();
    for claim in new_claims {
        let filter = ClaimFilter {
            claim_type: Some(claim.claim_type),
            subject_id: Some(claim.subject.id.clone()),
            status: Some(ClaimStatus::Active),
            ..Default::default()
        };
        let candidates = store.get_claims(&filter).map_err(store_err)?;
        if candidates.iter().all(|c| c.id == claim.id) {
            continue;
        }
        let existing: Vec<Contradiction> = store
            .get_contradictions_for_claim(&claim.id)
            .map_err(store_err)?
            .into_iter()
            .filter(|c| c.status == ContradictionStatus::Unresolved)
            .collect();

        for other in candidates.iter().filter(|c| c.id != claim.id) {
            let seen = existing
                .iter()
                .chain(found.iter())
                .any(|c| c.pairs(&claim.id, &other.id));
            if seen {
                continue;
            }
            if let Some((kind, severity, explanation)) = classify(claim, other) {
                found.push(Contradiction::new(
                    claim.id.clone(),
                    other.id.clone(),
                    kind,
                    severity,
                    explanation,
                    now,
                ));
            }
        }
    }
    Ok(found)
}

fn contradiction_defeater(contradiction: &Contradiction) -> ExtendedDefeater {
    let (severity, reduction) = match contradiction.severity {
        ContradictionSeverity::Blocking => (DefeaterSeverity::Partial, 0.3),
        ContradictionSeverity::Significant => (DefeaterSeverity::Warning, 0.2),
        ContradictionSeverity::Minor => (DefeaterSeverity::Warning, 0.1),
    };
    let mut pair = vec![contradiction.claim_a.clone(), contradiction.claim_b.clone()];
    pair.sort();
    ExtendedDefeater::new(
        DefeaterType::Contradiction,
        severity,
        pair,
        reduction,
        contradiction.explanation.clone(),
        contradiction.detected_at,
    )
    .with_action(Remediation::ReviewContradiction)
    .with_evidence(format!("contradiction={}", contradiction.id))
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn has_negation(words: &[String]) -> bool {
    words.iter().any(|w| NEGATION_MARKERS.contains(&w.as_str()))
}

fn has_word(words: &[String], word: &str) -> bool {
    words.iter().any(|w| w == word)
}

/// Classify the tension between two claims about the same subject
pub(crate) fn classify(a: &Claim, b: &Claim) -> Option<(ContradictionType, ContradictionSeverity, String)> {
    let (words_a, words_b) = (words(&a.proposition), words(&b.proposition));
    // identical after case and punctuation folding
    if words_a == words_b {
        return None;
    }

    let one_sided_negation = has_negation(&words_a) != has_negation(&words_b);
    let always_never = (has_word(&words_a, "always") && has_word(&words_b, "never"))
        || (has_word(&words_a, "never") && has_word(&words_b, "always"));

    if one_sided_negation || always_never {
        Some((
            ContradictionType::Direct,
            ContradictionSeverity::Blocking,
            format!("\"{}\" negates \"{}\"", a.proposition, b.proposition),
        ))
    } else if a.claim_type == ClaimType::Temporal || b.claim_type == ClaimType::Temporal {
        Some((
            ContradictionType::Temporal,
            ContradictionSeverity::Significant,
            format!("\"{}\" and \"{}\" may hold at different times", a.proposition, b.proposition),
        ))
    } else {
        Some((
            ContradictionType::Scope,
            ContradictionSeverity::Minor,
            format!("\"{}\" and \"{}\" differ in scope", a.proposition, b.proposition),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{claim, seed, store, DAY_MS, NOW};
    use epigraph_domain::{ClaimSource, EvidenceStore, SourceKind};

    fn at_now() -> DetectionContext {
        DetectionContext::at("2023-11-14T22:13:20Z")
    }

    #[test]
    fn test_reference_time_parsing() {
        assert_eq!(at_now().reference_time().unwrap(), NOW);
        assert!(matches!(
            DetectionContext::at("yesterday").reference_time(),
            Err(DefeaterError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_staleness_reduction_and_severity() {
        let mut s = store();
        let mut fresh = claim("fresh", "fn:a", "src/a.rs");
        fresh.created_at = NOW - 10 * DAY_MS;
        let mut old = claim("old", "fn:b", "src/b.rs");
        old.created_at = NOW - 45 * DAY_MS;
        let mut ancient = claim("ancient", "fn:c", "src/c.rs");
        ancient.created_at = NOW - 400 * DAY_MS;
        seed(&mut s, &[fresh, old, ancient]);

        let result = detect_defeaters(&s, &at_now(), &DefeaterConfig::default());
        assert!(result.errors.is_empty());
        assert_eq!(result.defeaters.len(), 2);

        let old_d = result.defeaters.iter().find(|d| d.covers(&"old".into())).unwrap();
        assert_eq!(old_d.severity, DefeaterSeverity::Warning);
        assert!((old_d.confidence_reduction - 0.15).abs() < 1e-9);
        assert!(old_d.auto_resolvable);

        let ancient_d = result.defeaters.iter().find(|d| d.covers(&"ancient".into())).unwrap();
        assert_eq!(ancient_d.severity, DefeaterSeverity::Partial);
        assert_eq!(ancient_d.confidence_reduction, 0.3);
        assert_eq!(result.affected_claim_ids, vec![ClaimId::from("ancient"), ClaimId::from("old")]);
    }

    #[test]
    fn test_staleness_skips_claims_with_pending_defeater() {
        let mut s = store();
        let mut old = claim("old", "fn:b", "src/b.rs");
        old.created_at = NOW - 45 * DAY_MS;
        seed(&mut s, &[old]);

        let first = detect_defeaters(&s, &at_now(), &DefeaterConfig::default());
        s.upsert_defeaters(&first.defeaters).unwrap();

        let second = detect_defeaters(&s, &at_now(), &DefeaterConfig::default());
        assert!(second.defeaters.is_empty());
    }

    #[test]
    fn test_pending_staleness_only_suppresses_its_own_claims() {
        let mut s = store();
        let claims: Vec<Claim> = ["a", "b", "c"]
            .iter()
            .map(|id| {
                let mut c = claim(id, "fn:b", "src/b.rs");
                c.created_at = NOW - 45 * DAY_MS;
                c
            })
            .collect();
        seed(&mut s, &claims);
        s.upsert_defeaters(&[
            ExtendedDefeater::new(DefeaterType::Staleness, DefeaterSeverity::Warning, vec!["a".into()], 0.1, "old", NOW),
            ExtendedDefeater::new(DefeaterType::CodeChange, DefeaterSeverity::Partial, vec!["b".into()], 0.2, "edit", NOW),
        ])
        .unwrap();

        let result = detect_defeaters(&s, &at_now(), &DefeaterConfig::default());
        assert_eq!(result.affected_claim_ids, vec![ClaimId::from("b"), ClaimId::from("c")]);
        assert!(result.defeaters.iter().all(|d| d.defeater_type == DefeaterType::Staleness));
    }

    #[test]
    fn test_code_change_matches_file_and_subject() {
        let mut s = store();
        seed(
            &mut s,
            &[
                claim("by-file", "fn:login", "src/auth.rs"),
                claim("by-id", "src/auth.rs::Session", "src/session.rs"),
                claim("other", "fn:render", "src/view.rs"),
            ],
        );
        let ctx = DetectionContext {
            changed_files: vec!["./src/auth.rs".to_string(), "README.md".to_string()],
            ..at_now()
        };

        let result = detect_defeaters(&s, &ctx, &DefeaterConfig::default());
        assert_eq!(result.defeaters.len(), 1);
        let d = &result.defeaters[0];
        assert_eq!(d.defeater_type, DefeaterType::CodeChange);
        assert_eq!(d.severity, DefeaterSeverity::Partial);
        assert_eq!(d.confidence_reduction, 0.2);
        assert_eq!(d.affected_claim_ids, vec![ClaimId::from("by-file"), ClaimId::from("by-id")]);
        assert_eq!(d.evidence, "src/auth.rs");
    }

    #[test]
    fn test_test_failure_is_full_severity() {
        let mut s = store();
        let mut from_test = claim("from-test", "fn:login", "src/auth.rs");
        from_test.source = ClaimSource::new(SourceKind::Test, "tests::login_rejects_bad_password");
        let about_test = claim("about-test", "tests::login_rejects_bad_password", "tests/auth.rs");
        let defeated = claim("gone", "tests::login_rejects_bad_password", "tests/auth.rs")
            .with_status(ClaimStatus::Defeated);
        seed(&mut s, &[from_test, about_test, defeated]);

        let ctx = DetectionContext {
            failed_tests: vec!["tests::login_rejects_bad_password".to_string()],
            ..at_now()
        };
        let result = detect_defeaters(&s, &ctx, &DefeaterConfig::default());
        assert_eq!(result.defeaters.len(), 1);
        let d = &result.defeaters[0];
        assert_eq!(d.severity, DefeaterSeverity::Full);
        assert_eq!(d.confidence_reduction, 1.0);
        assert!(!d.auto_resolvable);
        assert_eq!(d.remediation(), Remediation::RerunTests);
        assert_eq!(d.affected_claim_ids.len(), 2);
        assert!(!d.covers(&"gone".into()));
    }

    #[test]
    fn test_hash_mismatch_unknown_claim_is_isolated() {
        let mut s = store();
        seed(&mut s, &[claim("c1", "fn:a", "src/a.rs")]);
        let ctx = DetectionContext {
            hash_mismatches: vec![
                HashMismatch {
                    claim_id: "missing".into(),
                    expected: "aaa".to_string(),
                    actual: "bbb".to_string(),
                },
                HashMismatch {
                    claim_id: "c1".into(),
                    expected: "abc".to_string(),
                    actual: "def".to_string(),
                },
            ],
            ..at_now()
        };

        let result = detect_defeaters(&s, &ctx, &DefeaterConfig::default());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].detector, "hash_mismatch");
        assert_eq!(result.defeaters.len(), 1);
        assert_eq!(result.defeaters[0].severity, DefeaterSeverity::Full);
        assert_eq!(result.defeaters[0].evidence, "expected=abc actual=def");
    }

    #[test]
    fn test_invalid_timestamp_only_fails_staleness() {
        let mut s = store();
        seed(&mut s, &[claim("c1", "fn:a", "src/a.rs")]);
        let ctx = DetectionContext {
            timestamp: Some("not a time".to_string()),
            changed_files: vec!["src/a.rs".to_string()],
            ..Default::default()
        };

        let result = detect_defeaters(&s, &ctx, &DefeaterConfig::default());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].detector, "staleness");
        assert_eq!(result.defeaters.len(), 1);
        assert_eq!(result.defeaters[0].defeater_type, DefeaterType::CodeChange);
    }

    #[test]
    fn test_closed_store_fails_every_detector_without_panicking() {
        let mut s = store();
        s.close().unwrap();
        let ctx = DetectionContext {
            changed_files: vec!["src/a.rs".to_string()],
            failed_tests: vec!["t".to_string()],
            ..at_now()
        };
        let result = detect_defeaters(&s, &ctx, &DefeaterConfig::default());
        assert!(result.defeaters.is_empty());
        assert_eq!(result.errors.len(), 3);
    }

    #[test]
    fn test_provider_outage_matches_case_insensitively() {
        let mut s = store();
        let mut human = claim("human", "fn:b", "src/b.rs");
        human.source = ClaimSource::new(SourceKind::Human, "openai reviewer");
        seed(&mut s, &[claim("llm", "fn:a", "src/a.rs"), human]);

        let mut ctx = at_now();
        ctx.provider_status.insert("OpenAI".to_string(), false);
        ctx.provider_status.insert("anthropic".to_string(), true);

        let result = detect_defeaters(&s, &ctx, &DefeaterConfig::default());
        assert_eq!(result.defeaters.len(), 1);
        let d = &result.defeaters[0];
        assert_eq!(d.defeater_type, DefeaterType::ProviderUnavailable);
        assert_eq!(d.severity, DefeaterSeverity::Warning);
        assert_eq!(d.affected_claim_ids, vec![ClaimId::from("llm")]);
    }

    #[test]
    fn test_verify_provider() {
        let mut status = BTreeMap::new();
        status.insert("openai".to_string(), false);
        status.insert("local".to_string(), true);

        assert!(verify_provider(&status, "local").is_ok());
        assert!(verify_provider(&status, "unknown").is_ok());
        match verify_provider(&status, "openai") {
            Err(DefeaterError::ProviderUnavailable { provider }) => assert_eq!(provider, "openai"),
            other => panic!("expected ProviderUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_contradiction_detection() {
        let mut s = store();
        let mut existing = claim("existing", "fn:parse", "src/parse.rs");
        existing.proposition = "parse returns an error on empty input".to_string();
        let mut incoming = claim("incoming", "fn:parse", "src/parse.rs");
        incoming.proposition = "parse does not return an error on empty input".to_string();
        seed(&mut s, &[existing, incoming.clone()]);

        let ctx = DetectionContext {
            new_claims: vec![incoming],
            ..at_now()
        };
        let result = detect_defeaters(&s, &ctx, &DefeaterConfig::default());
        assert_eq!(result.contradictions.len(), 1);
        let c = &result.contradictions[0];
        assert_eq!(c.contradiction_type, ContradictionType::Direct);
        assert_eq!(c.severity, ContradictionSeverity::Blocking);

        let d = result
            .defeaters
            .iter()
            .find(|d| d.defeater_type == DefeaterType::Contradiction)
            .unwrap();
        assert_eq!(d.severity, DefeaterSeverity::Partial);
        assert_eq!(d.confidence_reduction, 0.3);
        assert_eq!(d.affected_claim_ids, vec![ClaimId::from("existing"), ClaimId::from("incoming")]);
    }

    #[test]
    fn test_contradiction_skips_recorded_pairs() {
        let mut s = store();
        let mut existing = claim("existing", "fn:parse", "src/parse.rs");
        existing.proposition = "parse never allocates".to_string();
        let mut incoming = claim("incoming", "fn:parse", "src/parse.rs");
        incoming.proposition = "parse always allocates".to_string();
        seed(&mut s, &[existing, incoming.clone()]);
        s.upsert_contradiction(&Contradiction::new(
            "incoming".into(),
            "existing".into(),
            ContradictionType::Direct,
            ContradictionSeverity::Blocking,
            "already known",
            NOW,
        ))
        .unwrap();

        let ctx = DetectionContext {
            new_claims: vec![incoming],
            ..at_now()
        };
        let result = detect_defeaters(&s, &ctx, &DefeaterConfig::default());
        assert!(result.contradictions.is_empty());
    }

    #[test]
    fn test_classify() {
        let base = claim("a", "fn:x", "src/x.rs");
        let with = |id: &str, text: &str, t: ClaimType| {
            let mut c = claim(id, "fn:x", "src/x.rs");
            c.proposition = text.to_string();
            c.claim_type = t;
            c
        };

        let a = with("a", "x always retries", ClaimType::Behavioral);
        let b = with("b", "x never retries", ClaimType::Behavioral);
        assert_eq!(classify(&a, &b).unwrap().0, ContradictionType::Direct);

        let a = with("a", "x was added in v2", ClaimType::Temporal);
        let b = with("b", "x was added in v3", ClaimType::Temporal);
        let (kind, severity, _) = classify(&a, &b).unwrap();
        assert_eq!((kind, severity), (ContradictionType::Temporal, ContradictionSeverity::Significant));

        let a = with("a", "x handles UTF-8 input", ClaimType::Behavioral);
        let b = with("b", "x handles ASCII input", ClaimType::Behavioral);
        assert_eq!(classify(&a, &b).unwrap().1, ContradictionSeverity::Minor);

        let same = with("b", "  X validates its INPUT. ", ClaimType::Behavioral);
        let mut base = base;
        base.proposition = "x validates its input".to_string();
        assert!(classify(&base, &same).is_none());
    }
}

//! Engine façade tying detection, application and resolution together

use crate::{
    apply_defeaters, assess_health, detect_defeaters, plan_resolutions, resolution, ApplicationResult,
    DefeaterConfig, DefeaterError, DefeaterMetrics, DetectionContext, DetectionResult, GraphHealthAssessment,
    ResolutionAction, ResolutionOutcome,
};
use epigraph_domain::{ContradictionId, ContradictionResolution, DefeaterId, EvidenceStore, ExtendedDefeater};
use serde::Serialize;
use std::fmt::Display;
use std::time::Instant;
use tracing::info;

/// What one detect-and-apply cycle did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    /// Detection output, including deferred defeaters carried into the cycle
    pub detection: DetectionResult,
    /// Application output
    pub application: ApplicationResult,
}

/// Defeater engine: owns configuration, metrics and the deferred backlog
///
/// Defeaters beyond `max_batch_size` are kept in the backlog and applied
/// ahead of newly detected ones on the next cycle.
pub struct DefeaterEngine {
    config: DefeaterConfig,
    metrics: DefeaterMetrics,
    backlog: Vec<ExtendedDefeater>,
}

impl DefeaterEngine {
    /// Create an engine with the given configuration
    pub fn new(config: DefeaterConfig) -> Self {
        Self {
            config,
            metrics: DefeaterMetrics::new(),
            backlog: Vec::new(),
        }
    }

    /// Create an engine with default configuration
    pub fn default_config() -> Self {
        Self::new(DefeaterConfig::default())
    }

    /// Current configuration
    pub fn config(&self) -> &DefeaterConfig {
        &self.config
    }

    /// Get current metrics
    pub fn metrics(&self) -> &DefeaterMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Defeaters waiting for a later cycle
    pub fn backlog(&self) -> &[ExtendedDefeater] {
        &self.backlog
    }

    /// Run every detector (read-only)
    pub fn detect<S>(&mut self, store: &S, ctx: &DetectionContext) -> DetectionResult
    where
        S: EvidenceStore,
        S::Error: Display,
    {
        let detection = detect_defeaters(store, ctx, &self.config);
        self.metrics.record_detection(&detection);
        detection
    }

    /// Persist and apply a detection result
    pub fn apply<S>(&mut self, store: &mut S, detection: DetectionResult) -> ApplicationResult
    where
        S: EvidenceStore,
        S::Error: Display,
    {
        let application = apply_defeaters(store, detection, &self.config);
        self.metrics.record_application(&application);
        application
    }

    /// Detect, then apply together with the backlog from earlier cycles
    ///
    /// # Errors
    ///
    /// Fails only if the store is not initialized; everything else is
    /// reported per item in the returned [`CycleReport`].
    pub fn run_cycle<S>(&mut self, store: &mut S, ctx: &DetectionContext) -> Result<CycleReport, DefeaterError>
    where
        S: EvidenceStore,
        S::Error: Display,
    {
        if !store.is_initialized() {
            return Err(DefeaterError::Store("store is not initialized".to_string()));
        }
        let start = Instant::now();

        let mut detection = self.detect(store, ctx);
        if !self.backlog.is_empty() {
            let mut fresh = std::mem::take(&mut detection.defeaters);
            // a backlog entry of the same type over the same claims wins
            fresh.retain(|d| {
                !self
                    .backlog
                    .iter()
                    .any(|b| b.defeater_type == d.defeater_type && b.affected_claim_ids == d.affected_claim_ids)
            });
            detection.defeaters = std::mem::take(&mut self.backlog);
            detection.defeaters.extend(fresh);
        }

        let application = self.apply(store, detection.clone());
        self.backlog = application.deferred.clone();

        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics.record_cycle(elapsed);
        info!(
            detected = detection.defeaters.len(),
            activated = application.activated_defeaters.len(),
            defeated = application.defeated_claims.len(),
            deferred = self.backlog.len(),
            elapsed_ms = elapsed,
            "Defeater cycle complete"
        );

        Ok(CycleReport { detection, application })
    }

    /// Resolve a defeater and restore the claims it alone held down
    pub fn resolve<S>(&mut self, store: &mut S, id: &DefeaterId) -> Result<ResolutionOutcome, DefeaterError>
    where
        S: EvidenceStore,
        S::Error: Display,
    {
        let outcome = resolution::resolve_defeater(store, id)?;
        if outcome.transitioned {
            self.metrics.record_resolution(1);
        }
        Ok(outcome)
    }

    /// Resolve every active auto-resolvable defeater
    pub fn resolve_auto_resolvable<S>(
        &mut self,
        store: &mut S,
    ) -> Result<Vec<(DefeaterId, ResolutionOutcome)>, DefeaterError>
    where
        S: EvidenceStore,
        S::Error: Display,
    {
        let resolved = resolution::resolve_auto_resolvable(store)?;
        self.metrics
            .record_resolution(resolved.iter().filter(|(_, o)| o.transitioned).count());
        Ok(resolved)
    }

    /// Resolve a contradiction with an explicit resolution
    pub fn resolve_contradiction<S>(
        &mut self,
        store: &mut S,
        id: &ContradictionId,
        resolution: Option<ContradictionResolution>,
    ) -> Result<ResolutionOutcome, DefeaterError>
    where
        S: EvidenceStore,
        S::Error: Display,
    {
        resolution::resolve_contradiction(store, id, resolution)
    }

    /// Remediation plan for every active defeater
    pub fn plan_resolutions<S>(&self, store: &S) -> Result<Vec<ResolutionAction>, DefeaterError>
    where
        S: EvidenceStore,
        S::Error: Display,
    {
        plan_resolutions(store)
    }

    /// Score the graph and rank what needs attention
    pub fn assess_health<S>(&self, store: &S) -> Result<GraphHealthAssessment, DefeaterError>
    where
        S: EvidenceStore,
        S::Error: Display,
    {
        assess_health(store, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{claim, seed, store, DAY_MS, NOW};
    use epigraph_domain::{ClaimStatus, EvidenceStore};

    fn at_now() -> DetectionContext {
        DetectionContext::at("2023-11-14T22:13:20Z")
    }

    #[test]
    fn test_engine_creation() {
        let engine = DefeaterEngine::default_config();
        assert_eq!(engine.config(), &DefeaterConfig::default());
        assert_eq!(engine.metrics().cycle_count, 0);
        assert!(engine.backlog().is_empty());
    }

    #[test]
    fn test_backlog_carries_to_next_cycle() {
        let mut s = store();
        let claims: Vec<_> = (0..5)
            .map(|i| {
                let mut c = claim(&format!("c{}", i), &format!("fn:{}", i), "src/x.rs");
                c.created_at = NOW - 45 * DAY_MS;
                c
            })
            .collect();
        seed(&mut s, &claims);

        let mut engine = DefeaterEngine::new(DefeaterConfig {
            max_batch_size: 2,
            ..Default::default()
        });

        let first = engine.run_cycle(&mut s, &at_now()).unwrap();
        assert_eq!(first.application.activated_defeaters.len(), 2);
        assert_eq!(engine.backlog().len(), 3);

        let second = engine.run_cycle(&mut s, &at_now()).unwrap();
        assert_eq!(second.detection.defeaters[0].id, first.application.deferred[0].id);
        assert_eq!(second.detection.defeaters.len(), 3);
        assert_eq!(second.application.activated_defeaters.len(), 2);
        assert_eq!(engine.backlog().len(), 1);

        let stale = s.get_claims(&epigraph_domain::ClaimFilter::with_status(ClaimStatus::Stale)).unwrap();
        assert_eq!(stale.len(), 4);
        assert_eq!(engine.metrics().cycle_count, 2);
        assert_eq!(engine.metrics().activated, 4);
    }

    #[test]
    fn test_run_cycle_requires_initialized_store() {
        let mut s = store();
        s.close().unwrap();
        let mut engine = DefeaterEngine::default_config();
        assert!(matches!(
            engine.run_cycle(&mut s, &at_now()),
            Err(DefeaterError::Store(_))
        ));
    }

    #[test]
    fn test_resolve_records_metrics() {
        let mut s = store();
        seed(&mut s, &[claim("c1", "fn:a", "src/a.rs")]);
        let mut engine = DefeaterEngine::default_config();
        let ctx = DetectionContext {
            failed_tests: vec!["fn:a".to_string()],
            ..at_now()
        };

        let report = engine.run_cycle(&mut s, &ctx).unwrap();
        assert_eq!(report.application.defeated_claims.len(), 1);
        let id = report.application.activated_defeaters[0].clone();

        let plan = engine.plan_resolutions(&s).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].priority, 90);

        let outcome = engine.resolve(&mut s, &id).unwrap();
        assert_eq!(outcome.restored_claims.len(), 1);
        assert_eq!(engine.metrics().resolved, 1);

        let health = engine.assess_health(&s).unwrap();
        assert_eq!(health.stats.stale_claim_count, 1);
    }
}

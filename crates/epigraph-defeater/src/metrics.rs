//! Metrics collection for defeater cycles

use crate::{ApplicationResult, DetectionResult};
use epigraph_domain::DefeaterType;
use serde::Serialize;
use std::collections::BTreeMap;

/// Counters accumulated across detection and application cycles
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DefeaterMetrics {
    /// Defeaters detected per type
    pub detected: BTreeMap<DefeaterType, usize>,

    /// Defeaters moved from pending to active
    pub activated: usize,

    /// Defeaters resolved (superseded or remediated)
    pub resolved: usize,

    /// Contradictions persisted
    pub contradictions_recorded: usize,

    /// Claims that ended an application pass defeated
    pub claims_defeated: usize,

    /// Detectors that failed
    pub detector_failures: usize,

    /// Items that failed to apply
    pub application_failures: usize,

    /// Defeaters pushed past the batch cap (counted each time they are deferred)
    pub deferred: usize,

    /// Completed cycles
    pub cycle_count: usize,

    /// Total cycle runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl DefeaterMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the output of a detection pass
    pub fn record_detection(&mut self, detection: &DetectionResult) {
        for defeater in &detection.defeaters {
            *self.detected.entry(defeater.defeater_type).or_insert(0) += 1;
        }
        self.detector_failures += detection.errors.len();
    }

    /// Record the output of an application pass
    pub fn record_application(&mut self, application: &ApplicationResult) {
        self.activated += application.activated_defeaters.len();
        self.resolved += application.resolved_defeaters.len();
        self.contradictions_recorded += application.recorded_contradictions.len();
        self.claims_defeated += application.defeated_claims.len();
        self.application_failures += application.failures.len();
        self.deferred += application.deferred.len();
    }

    /// Record explicitly resolved defeaters
    pub fn record_resolution(&mut self, count: usize) {
        self.resolved += count;
    }

    /// Record a cycle completion
    pub fn record_cycle(&mut self, runtime_ms: u64) {
        self.cycle_count += 1;
        self.total_runtime_ms += runtime_ms;
    }

    /// Get total defeaters detected across all types
    pub fn total_detected(&self) -> usize {
        self.detected.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Defeater Metrics Summary".to_string(),
            "========================".to_string(),
            format!("Cycles: {}", self.cycle_count),
            format!("Total runtime: {}ms", self.total_runtime_ms),
            String::new(),
        ];

        if !self.detected.is_empty() {
            lines.push("Detected by type:".to_string());
            for (defeater_type, count) in &self.detected {
                lines.push(format!("  {}: {}", defeater_type.as_str(), count));
            }
            lines.push(format!("  Total: {}", self.total_detected()));
            lines.push(String::new());
        }

        lines.push(format!("Activated: {}", self.activated));
        lines.push(format!("Resolved: {}", self.resolved));
        lines.push(format!("Contradictions recorded: {}", self.contradictions_recorded));
        lines.push(format!("Claims defeated: {}", self.claims_defeated));
        lines.push(format!("Deferred: {}", self.deferred));

        if self.detector_failures > 0 || self.application_failures > 0 {
            lines.push(format!(
                "Failures: {} detector, {} application",
                self.detector_failures, self.application_failures
            ));
        }

        lines.join("\n")
    }
}

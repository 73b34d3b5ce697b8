//! Calibration of predicted confidence against observed outcomes
//!
//! A prediction outcome pairs the confidence a claim carried with whether the
//! claim held up when checked. Reports over many outcomes measure how honest the
//! confidence numbers are and feed [`HistoricalSignals`] back into scoring.

use crate::confidence_computation::HistoricalSignals;
use crate::ClaimId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of equal-width buckets used for expected calibration error
pub const CALIBRATION_BUCKETS: usize = 10;

/// The recorded fate of one confidence prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    /// Claim the prediction was made for
    pub claim_id: ClaimId,
    /// Subject the claim is about
    pub subject_id: String,
    /// Confidence at prediction time [0.0, 1.0]
    pub predicted_confidence: f64,
    /// Whether the claim held up
    pub outcome: bool,
    /// When the outcome was recorded (ms since epoch)
    pub recorded_at: u64,
}

impl PredictionOutcome {
    /// Create an outcome, clamping the prediction into [0, 1]
    pub fn new(
        claim_id: ClaimId,
        subject_id: impl Into<String>,
        predicted_confidence: f64,
        outcome: bool,
        recorded_at: u64,
    ) -> Self {
        let predicted_confidence = if predicted_confidence.is_nan() {
            0.0
        } else {
            predicted_confidence.clamp(0.0, 1.0)
        };
        Self {
            claim_id,
            subject_id: subject_id.into(),
            predicted_confidence,
            outcome,
            recorded_at,
        }
    }
}

/// One confidence band of a calibration report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBucket {
    /// Inclusive lower edge
    pub lower: f64,
    /// Upper edge (inclusive only for the last bucket)
    pub upper: f64,
    /// Outcomes whose prediction fell in the band
    pub count: usize,
    /// Mean predicted confidence in the band
    pub mean_predicted: f64,
    /// Observed pass rate in the band
    pub pass_rate: f64,
}

/// Aggregate calibration over a set of outcomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Number of outcomes
    pub sample_count: usize,
    /// Outcomes that held up
    pub pass_count: usize,
    /// `pass_count / sample_count` (0 when empty)
    pub pass_rate: f64,
    /// Mean predicted confidence (0 when empty)
    pub mean_predicted: f64,
    /// Count-weighted mean of |pass rate − mean prediction| over buckets
    pub expected_calibration_error: f64,
    /// Non-empty buckets, lowest band first
    pub buckets: Vec<CalibrationBucket>,
}

impl CalibrationReport {
    /// Build a report from outcomes
    pub fn build(outcomes: &[PredictionOutcome]) -> Self {
        let sample_count = outcomes.len();
        if sample_count == 0 {
            return Self {
                sample_count: 0,
                pass_count: 0,
                pass_rate: 0.0,
                mean_predicted: 0.0,
                expected_calibration_error: 0.0,
                buckets: Vec::new(),
            };
        }

        let pass_count = outcomes.iter().filter(|o| o.outcome).count();
        let mean_predicted = outcomes.iter().map(|o| o.predicted_confidence).sum::<f64>() / sample_count as f64;

        let mut bands: Vec<(usize, f64, usize)> = vec![(0, 0.0, 0); CALIBRATION_BUCKETS];
        for outcome in outcomes {
            let index = ((outcome.predicted_confidence * CALIBRATION_BUCKETS as f64) as usize).min(CALIBRATION_BUCKETS - 1);
            let band = &mut bands[index];
            band.0 += 1;
            band.1 += outcome.predicted_confidence;
            band.2 += usize::from(outcome.outcome);
        }

        let width = 1.0 / CALIBRATION_BUCKETS as f64;
        let mut ece = 0.0;
        let mut buckets = Vec::new();
        for (i, (count, predicted_sum, passes)) in bands.into_iter().enumerate() {
            if count == 0 {
                continue;
            }
            let bucket = CalibrationBucket {
                lower: i as f64 * width,
                upper: (i + 1) as f64 * width,
                count,
                mean_predicted: predicted_sum / count as f64,
                pass_rate: passes as f64 / count as f64,
            };
            ece += (bucket.pass_rate - bucket.mean_predicted).abs() * count as f64 / sample_count as f64;
            buckets.push(bucket);
        }

        Self {
            sample_count,
            pass_count,
            pass_rate: pass_count as f64 / sample_count as f64,
            mean_predicted,
            expected_calibration_error: ece,
            buckets,
        }
    }

    /// One report per subject id
    pub fn by_subject(outcomes: &[PredictionOutcome]) -> BTreeMap<String, CalibrationReport> {
        let mut grouped: BTreeMap<String, Vec<PredictionOutcome>> = BTreeMap::new();
        for outcome in outcomes {
            grouped.entry(outcome.subject_id.clone()).or_default().push(outcome.clone());
        }
        grouped
            .into_iter()
            .map(|(subject, outcomes)| (subject, CalibrationReport::build(&outcomes)))
            .collect()
    }

    /// Whether predictions are on average more confident than outcomes justify
    pub fn is_overconfident(&self) -> bool {
        self.sample_count > 0 && self.mean_predicted > self.pass_rate
    }
}

impl HistoricalSignals {
    /// Validation history taken from a calibration report
    pub fn from_report(report: &CalibrationReport) -> Self {
        Self {
            retrieval_attempts: 0,
            retrieval_successes: 0,
            validations: u32::try_from(report.sample_count).unwrap_or(u32::MAX),
            validation_passes: u32::try_from(report.pass_count).unwrap_or(u32::MAX),
        }
    }
}

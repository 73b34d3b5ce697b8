//! Confidence computation module
//!
//! Turns measurable signals about a code entity into a bounded confidence
//! score for claims about it. The computation is pure: the same signals always
//! produce the same score, factors and suggestions.
//!
//! ```text
//! overall = clamp(structural × 0.50
//!               + semantic   × 0.30
//!               + historical × 0.15
//!               + cross_validation_adjustment,   // additive, [-0.1, +0.1]
//!               0.15, 0.85)
//! ```
//!
//! The score is never clamped to total ignorance nor to certainty.

use crate::SignalStrength;
use serde::{Deserialize, Serialize};

/// Weight of the structural sub-score
pub const STRUCTURAL_WEIGHT: f64 = 0.50;

/// Weight of the semantic sub-score
pub const SEMANTIC_WEIGHT: f64 = 0.30;

/// Weight of the historical sub-score
pub const HISTORICAL_WEIGHT: f64 = 0.15;

/// Magnitude bound of the additive cross-validation term
pub const MAX_CROSS_VALIDATION_ADJUSTMENT: f64 = 0.10;

/// Lowest confidence ever reported
pub const CONFIDENCE_FLOOR: f64 = 0.15;

/// Highest confidence ever reported
pub const CONFIDENCE_CEILING: f64 = 0.85;

/// Lower edge of the ideal subject size (lines)
pub const IDEAL_SIZE_MIN: u32 = 20;

/// Upper edge of the ideal subject size (lines)
pub const IDEAL_SIZE_MAX: u32 = 200;

/// Observations needed before history counts as much as the prior
const HISTORY_PRIOR_STRENGTH: f64 = 5.0;

/// Verbs and nouns that say nothing about what code is for
const GENERIC_TERMS: [&str; 10] = [
    "handles", "manages", "processes", "utility", "helper", "stuff", "things", "various", "misc", "does",
];

/// Structural evidence about the subject's code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralSignals {
    /// Share of parameters/returns carrying type annotations [0.0, 1.0]
    pub type_annotation_ratio: f64,
    /// The subject's docstring, if any
    pub docstring: Option<String>,
    /// Whether the subject is part of a public API
    pub exported: bool,
    /// Cyclomatic complexity
    pub cyclomatic_complexity: u32,
    /// Size in lines
    pub line_count: u32,
}

/// Semantic evidence about the subject's meaning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticSignals {
    /// The subject's name (e.g. `validate_token`)
    pub subject_name: String,
    /// The producer's purpose statement for the subject
    pub purpose: Option<String>,
    /// Documentation the purpose was derived from
    pub docstring: Option<String>,
}

/// How claims about the subject have fared before
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSignals {
    /// Times a claim about the subject was retrieved
    pub retrieval_attempts: u32,
    /// Retrievals judged useful
    pub retrieval_successes: u32,
    /// Times a claim about the subject was validated
    pub validations: u32,
    /// Validations that passed
    pub validation_passes: u32,
}

/// Agreement between independent extractors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationSignals {
    /// Extractors that produced a claim about the subject
    pub extractors_run: u32,
    /// Extractors that agreed with this claim
    pub extractors_agreeing: u32,
}

/// Full signal bundle for one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSignals {
    /// Structural signals
    pub structural: StructuralSignals,
    /// Semantic signals
    pub semantic: SemanticSignals,
    /// Historical signals
    pub historical: HistoricalSignals,
    /// Cross-validation signals
    pub cross_validation: CrossValidationSignals,
}

/// Direction a factor pushed the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorImpact {
    /// Raised confidence
    Positive,
    /// Lowered confidence
    Negative,
    /// Neither
    Neutral,
}

/// One measured input and its contribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceFactor {
    /// Factor name (e.g. `type_annotation_ratio`)
    pub name: String,
    /// Measured score [0.0, 1.0]
    pub value: f64,
    /// Effective weight in the overall score
    pub weight: f64,
    /// Direction of influence
    pub impact: FactorImpact,
}

impl ConfidenceFactor {
    fn new(name: &str, value: f64, weight: f64) -> Self {
        let impact = if value >= 0.7 {
            FactorImpact::Positive
        } else if value <= 0.3 {
            FactorImpact::Negative
        } else {
            FactorImpact::Neutral
        };
        Self {
            name: name.to_string(),
            value,
            weight,
            impact,
        }
    }

    /// How far this factor moved the score away from a neutral 0.5
    pub fn influence(&self) -> f64 {
        (self.value - 0.5).abs() * self.weight
    }
}

/// Score plus the diagnostics that explain it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceResult {
    /// Final score in [0.15, 0.85]
    pub overall: f64,
    /// Structural sub-score
    pub structural: f64,
    /// Semantic sub-score
    pub semantic: f64,
    /// Historical sub-score
    pub historical: f64,
    /// Additive cross-validation term in [-0.1, 0.1]
    pub cross_validation_adjustment: f64,
    /// Factors ordered by influence, strongest first
    pub factors: Vec<ConfidenceFactor>,
    /// Actionable ways to raise confidence
    pub suggestions: Vec<String>,
}

impl ConfidenceResult {
    /// Initial signal strength for a claim scored by this result
    ///
    /// Historical success seeds retrieval; test execution starts neutral until
    /// a test backs the claim; a freshly scored claim is fully recent.
    pub fn seed_signal_strength(&self) -> SignalStrength {
        SignalStrength::new(self.historical, self.structural, self.semantic, 0.5, 1.0)
    }
}

/// Compute confidence for a signal bundle
pub fn compute_confidence(signals: &ConfidenceSignals) -> ConfidenceResult {
    let mut factors = Vec::new();
    let mut suggestions = Vec::new();

    let structural = structural_score(&signals.structural, &mut factors, &mut suggestions);
    let semantic = semantic_score(&signals.semantic, &mut factors, &mut suggestions);
    let historical = historical_score(&signals.historical, &mut factors, &mut suggestions);
    let adjustment = cross_validation_adjustment(&signals.cross_validation, &mut suggestions);

    let base = structural * STRUCTURAL_WEIGHT + semantic * SEMANTIC_WEIGHT + historical * HISTORICAL_WEIGHT;
    let overall = (base + adjustment).clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING);

    factors.sort_by(|a, b| b.influence().total_cmp(&a.influence()));

    ConfidenceResult {
        overall,
        structural,
        semantic,
        historical,
        cross_validation_adjustment: adjustment,
        factors,
        suggestions,
    }
}

/// structural = types×0.30 + docs×0.25 + exported×0.20 + complexity×0.15 + size×0.10
fn structural_score(s: &StructuralSignals, factors: &mut Vec<ConfidenceFactor>, suggestions: &mut Vec<String>) -> f64 {
    let types = unit(s.type_annotation_ratio);
    let docs = documentation_quality(s.docstring.as_deref());
    let exported = if s.exported { 1.0 } else { 0.4 };
    let complexity = complexity_score(s.cyclomatic_complexity);
    let size = size_score(s.line_count);

    factors.push(ConfidenceFactor::new("type_annotation_ratio", types, 0.30 * STRUCTURAL_WEIGHT));
    factors.push(ConfidenceFactor::new("docstring_quality", docs, 0.25 * STRUCTURAL_WEIGHT));
    factors.push(ConfidenceFactor::new("exported", exported, 0.20 * STRUCTURAL_WEIGHT));
    factors.push(ConfidenceFactor::new("complexity", complexity, 0.15 * STRUCTURAL_WEIGHT));
    factors.push(ConfidenceFactor::new("size", size, 0.10 * STRUCTURAL_WEIGHT));

    if types < 0.5 {
        suggestions.push(format!(
            "Add type annotations (currently {:.0}% annotated)",
            types * 100.0
        ));
    }
    if docs < 0.4 {
        suggestions.push("Document the subject's parameters and return value".to_string());
    }
    if complexity < 0.5 {
        suggestions.push(format!(
            "Reduce cyclomatic complexity (currently {})",
            s.cyclomatic_complexity
        ));
    }
    if s.line_count > IDEAL_SIZE_MAX && size < 0.7 {
        suggestions.push(format!("Split the subject into smaller units ({} lines)", s.line_count));
    }

    types * 0.30 + docs * 0.25 + exported * 0.20 + complexity * 0.15 + size * 0.10
}

/// semantic = purpose×0.50 + docs×0.30 + name alignment×0.20
fn semantic_score(s: &SemanticSignals, factors: &mut Vec<ConfidenceFactor>, suggestions: &mut Vec<String>) -> f64 {
    let purpose = purpose_quality(s.purpose.as_deref());
    let docs = documentation_quality(s.docstring.as_deref());
    let alignment = name_alignment(&s.subject_name, s.purpose.as_deref());

    factors.push(ConfidenceFactor::new("purpose_quality", purpose, 0.50 * SEMANTIC_WEIGHT));
    factors.push(ConfidenceFactor::new("semantic_documentation", docs, 0.30 * SEMANTIC_WEIGHT));
    factors.push(ConfidenceFactor::new("name_alignment", alignment, 0.20 * SEMANTIC_WEIGHT));

    if purpose < 0.4 {
        suggestions.push("Write a specific purpose statement that avoids generic verbs".to_string());
    }
    if s.purpose.is_some() && alignment < 0.3 {
        suggestions.push(format!("Mention '{}' in its purpose statement", s.subject_name));
    }

    purpose * 0.50 + docs * 0.30 + alignment * 0.20
}

/// Observed success shrunk toward a 0.5 prior by `n / (n + 5)`
fn historical_score(h: &HistoricalSignals, factors: &mut Vec<ConfidenceFactor>, suggestions: &mut Vec<String>) -> f64 {
    let rates: Vec<f64> = [
        ratio(h.retrieval_successes, h.retrieval_attempts),
        ratio(h.validation_passes, h.validations),
    ]
    .into_iter()
    .flatten()
    .collect();

    let samples = f64::from(h.retrieval_attempts) + f64::from(h.validations);
    let score = if rates.is_empty() {
        0.5
    } else {
        let observed = rates.iter().sum::<f64>() / rates.len() as f64;
        let w = samples / (samples + HISTORY_PRIOR_STRENGTH);
        0.5 * (1.0 - w) + observed * w
    };

    factors.push(ConfidenceFactor::new("historical_success", score, HISTORICAL_WEIGHT));

    if samples < HISTORY_PRIOR_STRENGTH {
        suggestions.push("Record more retrieval and validation outcomes for this subject".to_string());
    }

    score
}

/// `(agreeing / run − 0.5) × 0.2`, only once at least two extractors ran
fn cross_validation_adjustment(c: &CrossValidationSignals, suggestions: &mut Vec<String>) -> f64 {
    if c.extractors_run < 2 {
        suggestions.push("Run a second extractor to cross-validate this claim".to_string());
        return 0.0;
    }
    let agreement = (c.extractors_agreeing.min(c.extractors_run)) as f64 / c.extractors_run as f64;
    if agreement < 0.5 {
        suggestions.push("Extractors disagree about this claim; review it manually".to_string());
    }
    ((agreement - 0.5) * 2.0 * MAX_CROSS_VALIDATION_ADJUSTMENT)
        .clamp(-MAX_CROSS_VALIDATION_ADJUSTMENT, MAX_CROSS_VALIDATION_ADJUSTMENT)
}

/// Size score: 1.0 inside the ideal range, continuous decay on both sides
///
/// Below the range the score is `sqrt(n / 20)`; above it `1 / (1 + ln(n / 200))`.
pub fn size_score(line_count: u32) -> f64 {
    let n = line_count as f64;
    if line_count == 0 {
        0.0
    } else if line_count < IDEAL_SIZE_MIN {
        (n / IDEAL_SIZE_MIN as f64).sqrt()
    } else if line_count <= IDEAL_SIZE_MAX {
        1.0
    } else {
        1.0 / (1.0 + (n / IDEAL_SIZE_MAX as f64).ln())
    }
}

/// Complexity score: 1.0 up to 5, linear decay to 0.0 at 30
pub fn complexity_score(cyclomatic_complexity: u32) -> f64 {
    match cyclomatic_complexity {
        0..=5 => 1.0,
        30.. => 0.0,
        cc => 1.0 - (cc - 5) as f64 / 25.0,
    }
}

/// Documentation quality from length and parameter/return coverage
pub fn documentation_quality(text: Option<&str>) -> f64 {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return 0.0;
    };
    let lower = text.to_lowercase();
    let words = text.split_whitespace().count() as f64;

    let mut score = (words / 30.0).min(1.0) * 0.6;
    if ["param", "arg", "# arguments", "args:"].iter().any(|m| lower.contains(m)) {
        score += 0.2;
    }
    if ["return", "yield", "# errors", "raises"].iter().any(|m| lower.contains(m)) {
        score += 0.2;
    }
    if words < 4.0 && (lower.contains("todo") || lower.contains("fixme")) {
        score -= 0.2;
    }
    unit(score)
}

/// Purpose-text quality: specific, reasonably sized, free of filler
pub fn purpose_quality(text: Option<&str>) -> f64 {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return 0.0;
    };
    let lower = text.to_lowercase();
    let words = lower.split_whitespace().count();

    let length = match words {
        0..=2 => 0.2,
        3..=40 => (words as f64 / 8.0).min(1.0),
        _ => 0.8,
    };
    let generic_hits = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| GENERIC_TERMS.contains(w))
        .count();
    let penalty = (generic_hits as f64 * 0.1).min(0.4);

    unit(length - penalty)
}

/// Share of the subject name's tokens that appear in the purpose text
///
/// Names are split on `_`, `::`, `.`, `-` and camelCase boundaries; tokens
/// shorter than three characters are ignored. A name with no usable tokens
/// scores a neutral 0.5.
pub fn name_alignment(subject_name: &str, purpose: Option<&str>) -> f64 {
    let Some(purpose) = purpose else {
        return 0.0;
    };
    let tokens = name_tokens(subject_name);
    if tokens.is_empty() {
        return 0.5;
    }
    let purpose = purpose.to_lowercase();
    let hits = tokens.iter().filter(|t| purpose.contains(t.as_str())).count();
    hits as f64 / tokens.len() as f64
}

fn name_tokens(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens.retain(|t| t.len() >= 3);
    tokens
}

fn ratio(numerator: u32, denominator: u32) -> Option<f64> {
    (denominator > 0).then(|| numerator.min(denominator) as f64 / denominator as f64)
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: confidence is always within [0.15, 0.85]
        #[test]
        fn test_confidence_bounds(
            types in 0.0f64..=1.0,
            exported in any::<bool>(),
            complexity in 0u32..100,
            lines in 0u32..10_000,
            attempts in prop_oneof![0u32..100, any::<u32>()],
            successes in prop_oneof![0u32..100, any::<u32>()],
            validations in prop_oneof![0u32..100, any::<u32>()],
            passes in prop_oneof![0u32..100, any::<u32>()],
            run in 0u32..10,
            agreeing in 0u32..10,
            has_doc in any::<bool>(),
        ) {
            let signals = ConfidenceSignals {
                structural: StructuralSignals {
                    type_annotation_ratio: types,
                    docstring: has_doc.then(|| "Returns the parsed value. Args: input".to_string()),
                    exported,
                    cyclomatic_complexity: complexity,
                    line_count: lines,
                },
                semantic: SemanticSignals {
                    subject_name: "parse_value".to_string(),
                    purpose: has_doc.then(|| "parse a value".to_string()),
                    docstring: None,
                },
                historical: HistoricalSignals {
                    retrieval_attempts: attempts,
                    retrieval_successes: successes,
                    validations,
                    validation_passes: passes,
                },
                cross_validation: CrossValidationSignals {
                    extractors_run: run,
                    extractors_agreeing: agreeing,
                },
            };

            let result = compute_confidence(&signals);
            prop_assert!(result.overall >= CONFIDENCE_FLOOR && result.overall <= CONFIDENCE_CEILING,
                "overall {} out of bounds", result.overall);
            prop_assert!(result.cross_validation_adjustment.abs() <= MAX_CROSS_VALIDATION_ADJUSTMENT + 1e-12);
            for sub in [result.structural, result.semantic, result.historical] {
                prop_assert!((0.0..=1.0).contains(&sub));
            }
        }

        /// Property: size scoring stays in [0, 1]
        #[test]
        fn test_size_score_range(lines in 0u32..1_000_000) {
            let s = size_score(lines);
            prop_assert!((0.0..=1.0).contains(&s));
        }
    }
}

//! Graph health assessment

use crate::{DefeaterConfig, DefeaterError};
use epigraph_domain::{
    health_score, now_millis, Contradiction, ContradictionSeverity, DefeaterSeverity, EvidenceStore,
    ExtendedDefeater, GraphStats, Remediation,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Urgency of a health issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuePriority {
    /// Cosmetic
    Low,
    /// Worth scheduling
    Medium,
    /// Degrades answers now
    High,
    /// Claims are unusable until fixed
    Critical,
}

impl IssuePriority {
    /// Get the priority name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuePriority::Low => "low",
            IssuePriority::Medium => "medium",
            IssuePriority::High => "high",
            IssuePriority::Critical => "critical",
        }
    }
}

/// One problem found in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIssue {
    /// Urgency
    pub priority: IssuePriority,
    /// What is wrong
    pub description: String,
    /// Number of claims involved
    pub affected_count: usize,
    /// What to do about it
    pub recommendation: String,
}

/// Point-in-time health of the evidence graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphHealthAssessment {
    /// Health score in [0.0, 1.0]
    pub overall_health: f64,
    /// Counts the score was computed from
    pub stats: GraphStats,
    /// Most urgent issues first
    pub top_issues: Vec<HealthIssue>,
    /// Distinct recommendations, in issue order
    pub recommendations: Vec<String>,
    /// When the assessment was made (ms since epoch)
    pub assessed_at: u64,
}

fn defeater_issue(defeater: &ExtendedDefeater) -> HealthIssue {
    let priority = match defeater.severity {
        DefeaterSeverity::Full => IssuePriority::High,
        DefeaterSeverity::Partial => IssuePriority::Medium,
        DefeaterSeverity::Warning => IssuePriority::Low,
    };
    let count = defeater.affected_claim_ids.len();
    let recommendation = match defeater.remediation() {
        Remediation::Revalidate => format!("Revalidate {} stale claim(s)", count),
        Remediation::Reindex => format!("Reindex {} to refresh {} claim(s)", defeater.evidence, count),
        Remediation::RerunTests => format!("Fix and re-run {}", defeater.evidence),
        Remediation::RetryProvider => format!("Retry extraction once {} is reachable", defeater.evidence),
        Remediation::ReviewContradiction => format!("Review {}", defeater.evidence),
        Remediation::GatherEvidence => format!("Gather more evidence for {} claim(s)", count),
    };
    HealthIssue {
        priority,
        description: format!("{} defeater {}: {}", defeater.defeater_type.as_str(), defeater.id, defeater.description),
        affected_count: count,
        recommendation,
    }
}

fn contradiction_issue(contradiction: &Contradiction) -> HealthIssue {
    let priority = match contradiction.severity {
        ContradictionSeverity::Blocking => IssuePriority::Critical,
        ContradictionSeverity::Significant => IssuePriority::High,
        ContradictionSeverity::Minor => IssuePriority::Medium,
    };
    HealthIssue {
        priority,
        description: format!(
            "Unresolved {} contradiction between {} and {}",
            contradiction.contradiction_type.as_str(),
            contradiction.claim_a,
            contradiction.claim_b
        ),
        affected_count: 2,
        recommendation: format!("Resolve contradiction {}", contradiction.id),
    }
}

fn aggregate_issues(stats: &GraphStats, config: &DefeaterConfig) -> Vec<HealthIssue> {
    let mut issues = Vec::new();
    if stats.claim_count > 0 && stats.mean_signal_strength < config.defeat_threshold + 0.1 {
        issues.push(HealthIssue {
            priority: IssuePriority::High,
            description: format!(
                "Mean signal strength {:.2} is close to the defeat threshold {:.2}",
                stats.mean_signal_strength, config.defeat_threshold
            ),
            affected_count: stats.claim_count,
            recommendation: "Gather more evidence for weak claims".to_string(),
        });
    }
    if stats.stale_claim_count > stats.active_claim_count {
        issues.push(HealthIssue {
            priority: IssuePriority::Medium,
            description: format!(
                "{} stale claims outnumber {} active claims",
                stats.stale_claim_count, stats.active_claim_count
            ),
            affected_count: stats.stale_claim_count,
            recommendation: "Revalidate stale claims".to_string(),
        });
    }
    issues
}

/// Score the graph and rank what needs attention
///
/// The score is [`health_score`]; issues are ordered by priority, then by the
/// number of claims involved, and capped at `max_top_issues`.
pub fn assess_health<S>(store: &S, config: &DefeaterConfig) -> Result<GraphHealthAssessment, DefeaterError>
where
    S: EvidenceStore,
    S::Error: Display,
{
    let stats = store.get_graph_stats().map_err(DefeaterError::store)?;
    let defeaters = store.get_active_defeaters().map_err(DefeaterError::store)?;
    let contradictions = store
        .get_unresolved_contradictions()
        .map_err(DefeaterError::store)?;

    let mut issues: Vec<HealthIssue> = contradictions
        .iter()
        .map(contradiction_issue)
        .chain(defeaters.iter().map(defeater_issue))
        .chain(aggregate_issues(&stats, config))
        .collect();
    issues.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.affected_count.cmp(&a.affected_count))
    });
    issues.truncate(config.max_top_issues);

    let mut recommendations: Vec<String> = Vec::new();
    for issue in &issues {
        if !recommendations.contains(&issue.recommendation) {
            recommendations.push(issue.recommendation.clone());
        }
    }

    Ok(GraphHealthAssessment {
        overall_health: health_score(&stats),
        stats,
        top_issues: issues,
        recommendations,
        assessed_at: now_millis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{claim, seed, store, NOW};
    use crate::{apply_defeaters, DetectionResult};
    use epigraph_domain::{ClaimId, ClaimStatus, ContradictionType, DefeaterType, EvidenceStore};

    #[test]
    fn test_empty_graph_is_healthy() {
        let s = store();
        let assessment = assess_health(&s, &DefeaterConfig::default()).unwrap();
        assert_eq!(assessment.overall_health, 1.0);
        assert!(assessment.top_issues.is_empty());
        assert!(assessment.recommendations.is_empty());
    }

    #[test]
    fn test_score_penalties() {
        let mut s = store();
        seed(
            &mut s,
            &[
                claim("a", "fn:a", "src/a.rs"),
                claim("b", "fn:a", "src/a.rs"),
                claim("c", "fn:c", "src/c.rs"),
                claim("d", "fn:d", "src/d.rs"),
            ],
        );
        apply_defeaters(
            &mut s,
            DetectionResult {
                defeaters: vec![ExtendedDefeater::new(
                    DefeaterType::TestFailure,
                    DefeaterSeverity::Full,
                    vec![ClaimId::from("d")],
                    1.0,
                    "failed",
                    NOW,
                )
                .with_evidence("tests::d")],
                contradictions: vec![Contradiction::new(
                    "a".into(),
                    "b".into(),
                    ContradictionType::Direct,
                    ContradictionSeverity::Blocking,
                    "opposite",
                    NOW,
                )],
                ..Default::default()
            },
            &DefeaterConfig::default(),
        );

        let assessment = assess_health(&s, &DefeaterConfig::default()).unwrap();
        // active c / (active c + defeated d) = 0.5, minus 0.03 and 0.05
        assert!((assessment.overall_health - 0.42).abs() < 1e-9);
        assert_eq!(assessment.top_issues[0].priority, IssuePriority::Critical);
        assert_eq!(assessment.top_issues[1].priority, IssuePriority::High);
        assert_eq!(assessment.top_issues[1].recommendation, "Fix and re-run tests::d");
        assert_eq!(assessment.stats.contradicted_claim_count, 2);
    }

    #[test]
    fn test_issues_are_capped_and_ranked_by_affected_count() {
        let mut s = store();
        let claims: Vec<_> = (0..6).map(|i| claim(&format!("c{}", i), "fn:x", "src/x.rs")).collect();
        seed(&mut s, &claims);
        let defeaters = (1..=4)
            .map(|n| {
                ExtendedDefeater::new(
                    DefeaterType::CodeChange,
                    DefeaterSeverity::Partial,
                    (0..n).map(|i| ClaimId::from(format!("c{}", i))).collect(),
                    0.0,
                    "changed",
                    NOW,
                )
            })
            .collect();
        apply_defeaters(
            &mut s,
            DetectionResult {
                defeaters,
                ..Default::default()
            },
            &DefeaterConfig::default(),
        );

        let config = DefeaterConfig {
            max_top_issues: 2,
            ..Default::default()
        };
        let assessment = assess_health(&s, &config).unwrap();
        assert_eq!(assessment.top_issues.len(), 2);
        assert_eq!(assessment.top_issues[0].affected_count, 4);
        assert_eq!(assessment.top_issues[1].affected_count, 3);
    }

    #[test]
    fn test_stale_majority_is_reported() {
        let mut s = store();
        seed(
            &mut s,
            &[
                claim("a", "fn:a", "src/a.rs").with_status(ClaimStatus::Stale),
                claim("b", "fn:b", "src/b.rs").with_status(ClaimStatus::Stale),
                claim("c", "fn:c", "src/c.rs"),
            ],
        );
        let assessment = assess_health(&s, &DefeaterConfig::default()).unwrap();
        assert_eq!(assessment.recommendations, vec!["Revalidate stale claims".to_string()]);
    }
}

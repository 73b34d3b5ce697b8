//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use epigraph_defeater::{
    ApplicationResult, DetectionResult, GraphHealthAssessment, IssuePriority, ResolutionAction,
};
use epigraph_domain::{CalibrationReport, Claim, ClaimStatus, GraphStats};
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Pretty-printed JSON for any serializable value.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)?)
    }

    fn table(header: &[&str], rows: Vec<Vec<String>>) -> String {
        let mut builder = Builder::default();
        builder.push_record(header.iter().map(|h| h.to_string()));
        for row in rows {
            builder.push_record(row);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format claims output.
    pub fn format_claims(&self, claims: &[Claim]) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.json(claims),
            OutputFormat::Quiet => Ok(claims.iter().map(|c| c.id.to_string()).collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                if claims.is_empty() {
                    return Ok(self.colorize("No claims found.", "yellow"));
                }
                let rows = claims
                    .iter()
                    .map(|claim| {
                        vec![
                            claim.id.to_string(),
                            claim.claim_type.as_str().to_string(),
                            claim.subject.id.clone(),
                            truncate(&claim.proposition, 48),
                            self.status(claim.status),
                            format!("{:.2}", claim.signal_strength.overall),
                        ]
                    })
                    .collect();
                Ok(Self::table(&["ID", "Type", "Subject", "Proposition", "Status", "Strength"], rows))
            }
        }
    }

    /// Format graph statistics.
    pub fn format_stats(&self, stats: &GraphStats) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.json(stats),
            OutputFormat::Quiet => Ok(stats.claim_count.to_string()),
            OutputFormat::Table => {
                let rows = vec![
                    vec!["Claims".to_string(), stats.claim_count.to_string()],
                    vec!["  active".to_string(), stats.active_claim_count.to_string()],
                    vec!["  stale".to_string(), stats.stale_claim_count.to_string()],
                    vec!["  defeated".to_string(), stats.defeated_claim_count.to_string()],
                    vec!["  contradicted".to_string(), stats.contradicted_claim_count.to_string()],
                    vec!["Edges".to_string(), stats.edge_count.to_string()],
                    vec!["Active defeaters".to_string(), stats.active_defeater_count.to_string()],
                    vec![
                        "Unresolved contradictions".to_string(),
                        stats.unresolved_contradiction_count.to_string(),
                    ],
                    vec!["Mean signal strength".to_string(), format!("{:.3}", stats.mean_signal_strength)],
                ];
                Ok(Self::table(&["Metric", "Value"], rows))
            }
        }
    }

    /// Format a health assessment.
    pub fn format_health(&self, assessment: &GraphHealthAssessment) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.json(assessment),
            OutputFormat::Quiet => Ok(format!("{:.3}", assessment.overall_health)),
            OutputFormat::Table => {
                let score = format!("Health: {:.2}", assessment.overall_health);
                let color = if assessment.overall_health >= 0.8 {
                    "green"
                } else if assessment.overall_health >= 0.5 {
                    "yellow"
                } else {
                    "red"
                };
                let mut lines = vec![self.colorize(&score, color)];
                if assessment.top_issues.is_empty() {
                    lines.push(self.success("No issues found"));
                    return Ok(lines.join("\n"));
                }

                let rows = assessment
                    .top_issues
                    .iter()
                    .map(|issue| {
                        vec![
                            self.priority(issue.priority),
                            issue.affected_count.to_string(),
                            issue.description.clone(),
                        ]
                    })
                    .collect();
                lines.push(Self::table(&["Priority", "Claims", "Issue"], rows));
                lines.push("Recommendations:".to_string());
                for recommendation in &assessment.recommendations {
                    lines.push(format!("  - {}", recommendation));
                }
                Ok(lines.join("\n"))
            }
        }
    }

    /// Format a detection result.
    pub fn format_detection(&self, detection: &DetectionResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.json(detection),
            OutputFormat::Quiet => Ok(detection
                .defeaters
                .iter()
                .map(|d| d.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let mut lines = Vec::new();
                if detection.is_empty() {
                    lines.push(self.info("No defeaters detected"));
                } else {
                    let rows = detection
                        .defeaters
                        .iter()
                        .map(|d| {
                            vec![
                                d.id.to_string(),
                                d.defeater_type.as_str().to_string(),
                                d.severity.as_str().to_string(),
                                format!("{:.2}", d.confidence_reduction),
                                d.affected_claim_ids.len().to_string(),
                                truncate(&d.description, 48),
                            ]
                        })
                        .collect();
                    lines.push(Self::table(
                        &["ID", "Type", "Severity", "Reduction", "Claims", "Description"],
                        rows,
                    ));
                    if !detection.contradictions.is_empty() {
                        lines.push(self.warning(&format!(
                            "{} contradiction(s) detected",
                            detection.contradictions.len()
                        )));
                    }
                }
                for failure in &detection.errors {
                    lines.push(self.error(&format!("{} detector failed: {}", failure.detector, failure.reason)));
                }
                Ok(lines.join("\n"))
            }
        }
    }

    /// Format an application result.
    pub fn format_application(&self, application: &ApplicationResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.json(application),
            OutputFormat::Quiet => Ok(application
                .updated_claims
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let mut lines = vec![self.success(&format!(
                    "Activated {} defeater(s), updated {} claim(s), defeated {}",
                    application.activated_defeaters.len(),
                    application.updated_claims.len(),
                    application.defeated_claims.len()
                ))];
                if !application.recorded_contradictions.is_empty() {
                    lines.push(self.warning(&format!(
                        "Recorded {} contradiction(s)",
                        application.recorded_contradictions.len()
                    )));
                }
                if !application.deferred.is_empty() {
                    lines.push(self.info(&format!(
                        "Deferred {} defeater(s) past the batch limit",
                        application.deferred.len()
                    )));
                }
                for failure in &application.failures {
                    lines.push(self.error(&format!("{}: {}", failure.item, failure.reason)));
                }
                Ok(lines.join("\n"))
            }
        }
    }

    /// Format a remediation plan.
    pub fn format_plan(&self, plan: &[ResolutionAction]) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.json(plan),
            OutputFormat::Quiet => Ok(plan
                .iter()
                .map(|a| a.defeater.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if plan.is_empty() {
                    return Ok(self.success("No active defeaters"));
                }
                let rows = plan
                    .iter()
                    .map(|a| {
                        vec![
                            a.priority.to_string(),
                            a.action.as_str().to_string(),
                            a.defeater.id.to_string(),
                            a.defeater.defeater_type.as_str().to_string(),
                            if a.defeater.auto_resolvable { "yes" } else { "no" }.to_string(),
                            truncate(&a.defeater.description, 48),
                        ]
                    })
                    .collect();
                Ok(Self::table(
                    &["Priority", "Action", "Defeater", "Type", "Auto", "Description"],
                    rows,
                ))
            }
        }
    }

    /// Format a calibration report.
    pub fn format_calibration(&self, report: &CalibrationReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.json(report),
            OutputFormat::Quiet => Ok(format!("{:.3}", report.expected_calibration_error)),
            OutputFormat::Table => {
                if report.sample_count == 0 {
                    return Ok(self.colorize("No outcomes recorded.", "yellow"));
                }
                let mut lines = vec![
                    format!(
                        "Samples: {}  Passed: {}  Pass rate: {:.2}  Mean predicted: {:.2}",
                        report.sample_count, report.pass_count, report.pass_rate, report.mean_predicted
                    ),
                    format!("Expected calibration error: {:.3}", report.expected_calibration_error),
                ];
                if report.is_overconfident() {
                    lines.push(self.warning("Predictions are overconfident"));
                }
                let rows = report
                    .buckets
                    .iter()
                    .filter(|b| b.count > 0)
                    .map(|b| {
                        vec![
                            format!("{:.1}-{:.1}", b.lower, b.upper),
                            b.count.to_string(),
                            format!("{:.2}", b.mean_predicted),
                            format!("{:.2}", b.pass_rate),
                        ]
                    })
                    .collect();
                lines.push(Self::table(&["Band", "Samples", "Predicted", "Observed"], rows));
                Ok(lines.join("\n"))
            }
        }
    }

    /// Format per-subject calibration reports.
    pub fn format_calibration_by_subject(&self, reports: &BTreeMap<String, CalibrationReport>) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.json(reports),
            OutputFormat::Quiet => Ok(reports.keys().cloned().collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                if reports.is_empty() {
                    return Ok(self.colorize("No outcomes recorded.", "yellow"));
                }
                let rows = reports
                    .iter()
                    .map(|(subject, r)| {
                        vec![
                            subject.clone(),
                            r.sample_count.to_string(),
                            format!("{:.2}", r.pass_rate),
                            format!("{:.2}", r.mean_predicted),
                            format!("{:.3}", r.expected_calibration_error),
                        ]
                    })
                    .collect();
                Ok(Self::table(&["Subject", "Samples", "Pass rate", "Predicted", "ECE"], rows))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn status(&self, status: ClaimStatus) -> String {
        let color = match status {
            ClaimStatus::Active => "green",
            ClaimStatus::Stale => "yellow",
            ClaimStatus::Defeated => "red",
            ClaimStatus::Contradicted => "magenta",
        };
        self.colorize(status.as_str(), color)
    }

    fn priority(&self, priority: IssuePriority) -> String {
        let color = match priority {
            IssuePriority::Critical => "red",
            IssuePriority::High => "magenta",
            IssuePriority::Medium => "yellow",
            IssuePriority::Low => "cyan",
        };
        self.colorize(priority.as_str(), color)
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            "magenta" => text.magenta().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Shorten text to at most `max` characters, marking the cut with `…`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

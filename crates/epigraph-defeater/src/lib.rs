//! Epigraph Defeater
//!
//! The defeater calculus: detects reasons to weaken or retract claims, applies
//! them to the evidence graph, and tracks their resolution.
//!
//! # Overview
//!
//! The engine is responsible for:
//! - **Detection**: proposing defeaters and contradictions from events
//!   (changed files, failed tests, hash mismatches, provider outages, new
//!   claims) and from claim age
//! - **Application**: persisting proposals, activating defeaters and lowering
//!   the signal components each defeater type implicates
//! - **Resolution**: remediation plans, resolving defeaters and contradictions,
//!   and restoring claims that are no longer held down
//! - **Health**: a single graph health score with ranked issues
//!
//! ## Claim Lifecycle
//!
//! | From | To | Trigger |
//! |------|----|---------|
//! | active | stale | staleness defeater applied |
//! | active, stale | defeated | full-severity defeater, or overall below `defeat_threshold` |
//! | active, stale | contradicted | contradiction recorded |
//! | defeated | stale | covering defeater resolved, no other active defeater |
//! | contradicted | stale | last unresolved contradiction resolved |
//!
//! # Usage
//!
//! ## One-off Cycle
//!
//! ```no_run
//! use epigraph_defeater::{DefeaterEngine, DetectionContext};
//! use epigraph_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = SqliteStore::open("epigraph.db")?;
//! let mut engine = DefeaterEngine::default_config();
//!
//! let ctx = DetectionContext {
//!     changed_files: vec!["src/auth.rs".to_string()],
//!     failed_tests: vec!["tests::login_rejects_bad_password".to_string()],
//!     ..Default::default()
//! };
//! let report = engine.run_cycle(&mut store, &ctx)?;
//! println!("{} claims updated", report.application.updated_claims.len());
//! println!("{}", engine.metrics().summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Background Worker
//!
//! ```no_run
//! use epigraph_defeater::{DefeaterConfig, DefeaterWorker};
//! use epigraph_store::SqliteStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut store = SqliteStore::open("epigraph.db")?;
//!     let mut worker = DefeaterWorker::new(DefeaterConfig::default());
//!
//!     // Run indefinitely (until Ctrl+C)
//!     worker.run(&mut store).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration Presets
//!
//! ```
//! use epigraph_defeater::DefeaterConfig;
//!
//! // Default: 30-day staleness, defeat below 0.3
//! let config = DefeaterConfig::default();
//!
//! // Aggressive: 7-day staleness, defeat below 0.4
//! let config = DefeaterConfig::aggressive();
//!
//! // Lenient: 90-day staleness, defeat below 0.2
//! let config = DefeaterConfig::lenient();
//! ```
//!
//! # Configuration
//!
//! The engine can be configured via TOML; missing keys take default values:
//!
//! ```toml
//! [defeater]
//! staleness_threshold_days = 30
//! defeat_threshold = 0.3
//! max_batch_size = 100
//! auto_activate = true
//! detection_interval_minutes = 60
//! max_top_issues = 10
//! ```
//!
//! # Resolution
//!
//! ```no_run
//! # use epigraph_defeater::DefeaterEngine;
//! # use epigraph_store::SqliteStore;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let mut store = SqliteStore::open(":memory:")?;
//! # let mut engine = DefeaterEngine::default_config();
//! for step in engine.plan_resolutions(&store)? {
//!     println!("[{}] {} {}", step.priority, step.action.as_str(), step.defeater.id);
//! }
//! engine.resolve_auto_resolvable(&mut store)?;
//!
//! let health = engine.assess_health(&store)?;
//! println!("health {:.2}", health.overall_health);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod application;
mod config;
mod detection;
mod engine;
mod error;
mod health;
mod metrics;
mod resolution;
mod worker;

#[cfg(test)]
mod test_support;

pub use application::{apply_defeaters, apply_reduction, ApplicationFailure, ApplicationResult, FailedItem};
pub use config::DefeaterConfig;
pub use detection::{
    detect_defeaters, verify_provider, DetectionContext, DetectionResult, DetectorFailure, HashMismatch,
};
pub use engine::{CycleReport, DefeaterEngine};
pub use error::DefeaterError;
pub use health::{assess_health, GraphHealthAssessment, HealthIssue, IssuePriority};
pub use metrics::DefeaterMetrics;
pub use resolution::{
    plan_resolutions, resolution_priority, resolve_auto_resolvable, resolve_contradiction, resolve_defeater,
    ResolutionAction, ResolutionOutcome,
};
pub use worker::DefeaterWorker;

//! Configuration for defeater detection and application
//!
//! One explicit value is threaded through every detection, application and
//! health call; there is no process-wide engine state.

use crate::DefeaterError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const MILLIS_PER_DAY: u64 = 86_400_000;

/// Configuration for the defeater engine
///
/// # Examples
///
/// ```
/// use epigraph_defeater::DefeaterConfig;
///
/// // Default configuration (balanced)
/// let config = DefeaterConfig::default();
/// assert_eq!(config.staleness_threshold_days, 30);
///
/// // Flags claims sooner and defeats them more readily
/// let config = DefeaterConfig::aggressive();
/// assert_eq!(config.staleness_threshold_days, 7);
///
/// // Tolerates older, weaker claims
/// let config = DefeaterConfig::lenient();
/// assert_eq!(config.staleness_threshold_days, 90);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefeaterConfig {
    /// Age after which an active claim is considered stale (days)
    pub staleness_threshold_days: u64,

    /// Claims whose overall signal strength drops below this are defeated
    pub defeat_threshold: f64,

    /// Maximum defeaters applied per cycle; the rest is deferred
    pub max_batch_size: usize,

    /// Activate defeaters (and apply their reductions) as they are persisted
    pub auto_activate: bool,

    /// How often the background worker runs a cycle (minutes)
    pub detection_interval_minutes: u64,

    /// Maximum issues listed in a health assessment
    pub max_top_issues: usize,
}

impl Default for DefeaterConfig {
    /// Balanced configuration
    ///
    /// - Staleness: 30 days
    /// - Defeat threshold: 0.3 overall strength
    /// - Batch: 100 defeaters per cycle
    /// - Interval: 60 minutes
    fn default() -> Self {
        Self {
            staleness_threshold_days: 30,
            defeat_threshold: 0.3,
            max_batch_size: 100,
            auto_activate: true,
            detection_interval_minutes: 60,
            max_top_issues: 10,
        }
    }
}

impl DefeaterConfig {
    /// Aggressive configuration: short staleness window, higher defeat floor
    ///
    /// Suitable for fast-moving codebases where week-old claims are suspect.
    pub fn aggressive() -> Self {
        Self {
            staleness_threshold_days: 7,
            defeat_threshold: 0.4,
            max_batch_size: 250,
            auto_activate: true,
            detection_interval_minutes: 15,
            max_top_issues: 20,
        }
    }

    /// Lenient configuration: long staleness window, low defeat floor
    ///
    /// Suitable for stable codebases or exploratory use.
    pub fn lenient() -> Self {
        Self {
            staleness_threshold_days: 90,
            defeat_threshold: 0.2,
            max_batch_size: 50,
            auto_activate: true,
            detection_interval_minutes: 240,
            max_top_issues: 5,
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, DefeaterError> {
        let config: Self = toml::from_str(s).map_err(|e| DefeaterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DefeaterError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DefeaterError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<(), DefeaterError> {
        if !(0.0..=1.0).contains(&self.defeat_threshold) {
            return Err(DefeaterError::Config(format!(
                "defeat_threshold {} is outside [0.0, 1.0]",
                self.defeat_threshold
            )));
        }
        if self.staleness_threshold_days == 0 {
            return Err(DefeaterError::Config("staleness_threshold_days must be positive".to_string()));
        }
        if self.max_batch_size == 0 {
            return Err(DefeaterError::Config("max_batch_size must be positive".to_string()));
        }
        if self.detection_interval_minutes == 0 {
            return Err(DefeaterError::Config("detection_interval_minutes must be positive".to_string()));
        }
        Ok(())
    }

    /// Staleness threshold in milliseconds
    pub fn staleness_threshold_ms(&self) -> u64 {
        self.staleness_threshold_days.saturating_mul(MILLIS_PER_DAY)
    }

    /// Get detection interval as Duration
    pub fn detection_interval(&self) -> Duration {
        Duration::from_secs(self.detection_interval_minutes.saturating_mul(60))
    }
}

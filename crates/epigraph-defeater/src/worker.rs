//! Background worker for periodic defeater cycles

use crate::{DefeaterConfig, DefeaterEngine, DefeaterError, DefeaterMetrics, DetectionContext};
use epigraph_domain::EvidenceStore;
use tokio::time::{interval, Duration};

/// Background worker that runs defeater cycles on a schedule
///
/// Each tick builds a [`DetectionContext`] carrying only the current time, so
/// the periodic run is a staleness sweep plus whatever backlog the engine
/// deferred. Event-driven detection (changed files, failed tests) goes through
/// [`DefeaterEngine::run_cycle`] directly.
///
/// # Examples
///
/// ```no_run
/// use epigraph_defeater::{DefeaterConfig, DefeaterWorker};
/// use epigraph_store::SqliteStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut store = SqliteStore::open("epigraph.db")?;
///     let mut worker = DefeaterWorker::new(DefeaterConfig::default());
///
///     // Run indefinitely (until Ctrl+C)
///     worker.run(&mut store).await?;
///     Ok(())
/// }
/// ```
pub struct DefeaterWorker {
    engine: DefeaterEngine,
    interval: Duration,
}

impl DefeaterWorker {
    /// Create a new background worker with the given configuration
    pub fn new(config: DefeaterConfig) -> Self {
        let interval = config.detection_interval();
        Self {
            engine: DefeaterEngine::new(config),
            interval,
        }
    }

    /// Create a worker with default configuration
    pub fn default_config() -> Self {
        Self::new(DefeaterConfig::default())
    }

    /// Override the tick interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    fn tick_context() -> DetectionContext {
        DetectionContext::at(chrono::Utc::now().to_rfc3339())
    }

    /// Run the worker until a shutdown signal (Ctrl+C) is received
    ///
    /// A failing cycle is logged and the worker keeps ticking.
    pub async fn run<S>(&mut self, store: &mut S) -> Result<(), DefeaterError>
    where
        S: EvidenceStore,
        S::Error: std::fmt::Display,
    {
        let mut ticker = interval(self.interval);

        tracing::info!("Defeater worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Starting defeater cycle");

                    match self.engine.run_cycle(store, &Self::tick_context()) {
                        Ok(report) => {
                            tracing::info!(
                                "Cycle completed: {} detected, {} activated, {} deferred",
                                report.detection.defeaters.len(),
                                report.application.activated_defeaters.len(),
                                report.application.deferred.len()
                            );
                        }
                        Err(e) => {
                            tracing::error!("Cycle failed: {}", e);
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping defeater worker");
                    break;
                }
            }
        }

        tracing::info!("Defeater worker stopped. Final metrics:\n{}", self.engine.metrics().summary());

        Ok(())
    }

    /// Run for a specific number of cycles, stopping at the first failure
    pub async fn run_cycles<S>(&mut self, store: &mut S, cycles: usize) -> Result<(), DefeaterError>
    where
        S: EvidenceStore,
        S::Error: std::fmt::Display,
    {
        let mut ticker = interval(self.interval);

        tracing::info!(
            "Defeater worker started for {} cycles (interval: {:?})",
            cycles,
            self.interval
        );

        for cycle in 0..cycles {
            ticker.tick().await;

            tracing::debug!("Starting defeater cycle {}/{}", cycle + 1, cycles);

            match self.engine.run_cycle(store, &Self::tick_context()) {
                Ok(report) => {
                    tracing::info!(
                        "Cycle {}/{} completed: {} detected, {} activated, {} deferred",
                        cycle + 1,
                        cycles,
                        report.detection.defeaters.len(),
                        report.application.activated_defeaters.len(),
                        report.application.deferred.len()
                    );
                }
                Err(e) => {
                    tracing::error!("Cycle {}/{} failed: {}", cycle + 1, cycles, e);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Defeater worker finished {} cycles. Final metrics:\n{}",
            cycles,
            self.engine.metrics().summary()
        );

        Ok(())
    }

    /// The engine driving each cycle
    pub fn engine(&self) -> &DefeaterEngine {
        &self.engine
    }

    /// Get a reference to the engine's current metrics
    pub fn metrics(&self) -> &DefeaterMetrics {
        self.engine.metrics()
    }

    /// Reset the engine's metrics counters
    pub fn reset_metrics(&mut self) {
        self.engine.reset_metrics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{claim, seed, store};
    use epigraph_domain::{now_millis, ClaimFilter, ClaimStatus};

    const DAY_MS: u64 = 86_400_000;

    #[tokio::test]
    async fn test_worker_creation() {
        let worker = DefeaterWorker::default_config();
        assert_eq!(worker.interval, Duration::from_secs(60 * 60));
        assert_eq!(worker.metrics().cycle_count, 0);
    }

    #[tokio::test]
    async fn test_run_cycles() {
        let mut s = store();
        let mut old = claim("old", "fn:a", "src/a.rs");
        old.created_at = now_millis() - 45 * DAY_MS;
        let mut fresh = claim("fresh", "fn:b", "src/b.rs");
        fresh.created_at = now_millis();
        seed(&mut s, &[old, fresh]);

        let mut worker = DefeaterWorker::default_config().with_interval(Duration::from_millis(10));
        worker.run_cycles(&mut s, 2).await.unwrap();

        assert_eq!(worker.metrics().cycle_count, 2);
        assert_eq!(worker.metrics().activated, 1);
        let stale = s.get_claims(&ClaimFilter::with_status(ClaimStatus::Stale)).unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id.as_str(), "old");
    }

    #[tokio::test]
    async fn test_run_cycles_stops_on_closed_store() {
        let mut s = store();
        s.close().unwrap();

        let mut worker = DefeaterWorker::default_config().with_interval(Duration::from_millis(10));
        let result = worker.run_cycles(&mut s, 3).await;
        assert!(result.is_err());
        assert_eq!(worker.metrics().cycle_count, 0);
    }

    #[tokio::test]
    async fn test_reset_metrics() {
        let mut s = store();
        let mut worker = DefeaterWorker::default_config().with_interval(Duration::from_millis(10));
        worker.run_cycles(&mut s, 1).await.unwrap();
        assert_eq!(worker.metrics().cycle_count, 1);

        worker.reset_metrics();
        assert_eq!(worker.metrics().cycle_count, 0);
    }
}

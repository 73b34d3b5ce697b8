//! Detect and watch command implementations.

use crate::cli::{DetectArgs, WatchArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use epigraph_defeater::{DefeaterEngine, DefeaterWorker, DetectionContext, HashMismatch};
use epigraph_domain::{Claim, EvidenceStore};
use epigraph_store::SqliteStore;
use std::fs;
use std::time::Duration;

/// Execute the detect command.
///
/// Without `--apply` nothing is written. With it, the new claims are stored
/// first so contradictions against them can be recorded, then a full cycle runs.
pub fn execute_detect(args: DetectArgs, store: &mut SqliteStore, config: &Config, formatter: &Formatter) -> Result<()> {
    let apply = args.apply;
    let ctx = build_context(args)?;
    let mut engine = DefeaterEngine::new(config.defeater.clone());

    if !apply {
        let detection = engine.detect(store, &ctx);
        println!("{}", formatter.format_detection(&detection)?);
        return Ok(());
    }

    if !ctx.new_claims.is_empty() {
        store.upsert_claims(&ctx.new_claims)?;
    }
    let report = engine.run_cycle(store, &ctx)?;
    println!("{}", formatter.format_detection(&report.detection)?);
    println!("{}", formatter.format_application(&report.application)?);
    Ok(())
}

/// Execute the watch command.
pub async fn execute_watch(args: WatchArgs, store: &mut SqliteStore, config: &Config, formatter: &Formatter) -> Result<()> {
    let mut worker = DefeaterWorker::new(config.defeater.clone());
    if let Some(secs) = args.interval_secs {
        if secs == 0 {
            return Err(CliError::InvalidInput("interval must be at least one second".to_string()));
        }
        worker = worker.with_interval(Duration::from_secs(secs));
    }

    match args.cycles {
        Some(cycles) => worker.run_cycles(store, cycles).await?,
        None => worker.run(store).await?,
    }

    println!("{}", formatter.info("Defeater worker stopped"));
    println!("{}", worker.metrics().summary());
    Ok(())
}

/// Turn command-line events into a detection context.
pub fn build_context(args: DetectArgs) -> Result<DetectionContext> {
    let hash_mismatches = args
        .hash_mismatches
        .iter()
        .map(|raw| parse_hash_mismatch(raw))
        .collect::<Result<Vec<_>>>()?;
    let new_claims = match &args.new_claims {
        Some(path) => read_new_claims(path)?,
        None => Vec::new(),
    };

    let ctx = DetectionContext {
        changed_files: args.changed_files,
        failed_tests: args.failed_tests,
        new_claims,
        timestamp: args.timestamp,
        hash_mismatches,
        provider_status: args
            .unavailable_providers
            .into_iter()
            .map(|provider| (provider, false))
            .collect(),
    };
    // reject a malformed --timestamp before touching the store
    ctx.reference_time()?;
    Ok(ctx)
}

/// Parse `CLAIM_ID:EXPECTED:ACTUAL`.
///
/// Claim ids may themselves contain colons, so the hashes are taken from the
/// right.
pub fn parse_hash_mismatch(raw: &str) -> Result<HashMismatch> {
    let mut parts = raw.rsplitn(3, ':');
    let actual = parts.next().unwrap_or_default();
    let expected = parts.next().unwrap_or_default();
    let claim_id = parts.next().unwrap_or_default();

    if claim_id.is_empty() || expected.is_empty() || actual.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "Invalid hash mismatch '{}', expected CLAIM_ID:EXPECTED:ACTUAL",
            raw
        )));
    }
    Ok(HashMismatch {
        claim_id: claim_id.into(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// Read a JSON array of claims.
fn read_new_claims(path: &str) -> Result<Vec<Claim>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

//! Outcome recording and calibration reports.

use crate::cli::{CalibrationArgs, OutcomeArgs};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use epigraph_domain::{now_millis, CalibrationReport, ClaimId, EvidenceStore, PredictionOutcome};
use epigraph_store::SqliteStore;

/// Execute the outcome command.
///
/// The claim's current overall strength is taken as the prediction.
pub fn execute_outcome(args: OutcomeArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    let claim_id = ClaimId::from(args.claim_id.as_str());
    let claim = store
        .get_claim(&claim_id)?
        .ok_or_else(|| CliError::NotFound(format!("claim {}", claim_id)))?;

    let outcome = PredictionOutcome::new(
        claim.id.clone(),
        claim.subject.id.clone(),
        claim.signal_strength.overall,
        !args.failed,
        now_millis(),
    );
    store.record_outcome(&outcome)?;

    let verdict = if outcome.outcome { "held" } else { "failed" };
    println!(
        "{}",
        formatter.success(&format!(
            "Recorded that {} {} (predicted {:.2})",
            claim_id, verdict, outcome.predicted_confidence
        ))
    );
    Ok(())
}

/// Execute the calibration command.
pub fn execute_calibration(args: CalibrationArgs, store: &SqliteStore, formatter: &Formatter) -> Result<()> {
    let outcomes = store.get_outcomes(args.subject.as_deref())?;
    if args.by_subject {
        println!(
            "{}",
            formatter.format_calibration_by_subject(&CalibrationReport::by_subject(&outcomes))?
        );
    } else {
        println!("{}", formatter.format_calibration(&CalibrationReport::build(&outcomes))?);
    }
    Ok(())
}

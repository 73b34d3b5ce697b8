//! Read-only graph inspection: stats, health and claim listings.

use crate::cli::ClaimsArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use epigraph_defeater::DefeaterEngine;
use epigraph_domain::{ClaimFilter, EvidenceStore};
use epigraph_store::SqliteStore;

/// Execute the stats command.
pub fn execute_stats(store: &SqliteStore, formatter: &Formatter) -> Result<()> {
    let stats = store.get_graph_stats()?;
    println!("{}", formatter.format_stats(&stats)?);
    Ok(())
}

/// Execute the health command.
pub fn execute_health(store: &SqliteStore, config: &Config, formatter: &Formatter) -> Result<()> {
    let engine = DefeaterEngine::new(config.defeater.clone());
    let assessment = engine.assess_health(store)?;
    println!("{}", formatter.format_health(&assessment)?);
    Ok(())
}

/// Execute the claims command.
pub fn execute_claims(args: ClaimsArgs, store: &SqliteStore, formatter: &Formatter) -> Result<()> {
    let filter = claim_filter(&args)?;
    let claims = store.get_claims(&filter)?;
    println!("{}", formatter.format_claims(&claims)?);
    Ok(())
}

fn claim_filter(args: &ClaimsArgs) -> Result<ClaimFilter> {
    if let Some(min) = args.min_strength {
        if !(0.0..=1.0).contains(&min) {
            return Err(CliError::InvalidInput(format!(
                "min strength must be between 0.0 and 1.0, got {}",
                min
            )));
        }
    }
    Ok(ClaimFilter {
        subject_id: args.subject.clone(),
        status: args.status.map(Into::into),
        min_strength: args.min_strength,
        limit: args.limit,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::StatusArg;
    use epigraph_domain::ClaimStatus;

    fn args() -> ClaimsArgs {
        ClaimsArgs {
            status: None,
            subject: None,
            min_strength: None,
            limit: None,
        }
    }

    #[test]
    fn test_claim_filter_from_args() {
        let filter = claim_filter(&ClaimsArgs {
            status: Some(StatusArg::Stale),
            subject: Some("fn:login".to_string()),
            limit: Some(5),
            ..args()
        })
        .unwrap();
        assert_eq!(filter.status, Some(ClaimStatus::Stale));
        assert_eq!(filter.subject_id.as_deref(), Some("fn:login"));
        assert_eq!(filter.limit, Some(5));
    }

    #[test]
    fn test_claim_filter_rejects_out_of_range_strength() {
        let result = claim_filter(&ClaimsArgs {
            min_strength: Some(1.5),
            ..args()
        });
        assert!(matches!(result, Err(CliError::InvalidInput(_))));
    }
}

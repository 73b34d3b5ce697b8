//! Remediation commands: plan, resolve and resolve-contradiction.

use crate::cli::{ResolveArgs, ResolveContradictionArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use epigraph_defeater::{DefeaterEngine, ResolutionOutcome};
use epigraph_domain::{now_millis, ContradictionId, ContradictionResolution, DefeaterId};
use epigraph_store::SqliteStore;

/// Execute the plan command.
pub fn execute_plan(store: &SqliteStore, config: &Config, formatter: &Formatter) -> Result<()> {
    let engine = DefeaterEngine::new(config.defeater.clone());
    let plan = engine.plan_resolutions(store)?;
    println!("{}", formatter.format_plan(&plan)?);
    Ok(())
}

/// Execute the resolve command.
pub fn execute_resolve(args: ResolveArgs, store: &mut SqliteStore, config: &Config, formatter: &Formatter) -> Result<()> {
    if args.ids.is_empty() && !args.auto {
        return Err(CliError::InvalidInput(
            "No defeater IDs provided (use --auto for auto-resolvable defeaters)".to_string(),
        ));
    }

    let mut engine = DefeaterEngine::new(config.defeater.clone());
    let mut outcomes: Vec<(DefeaterId, ResolutionOutcome)> = Vec::new();
    for id in &args.ids {
        let id = DefeaterId::from(id.as_str());
        let outcome = engine.resolve(store, &id)?;
        outcomes.push((id, outcome));
    }
    if args.auto {
        outcomes.extend(engine.resolve_auto_resolvable(store)?);
    }

    for (id, outcome) in &outcomes {
        if outcome.transitioned {
            println!(
                "{}",
                formatter.success(&format!(
                    "Resolved {} ({} claim(s) restored)",
                    id,
                    outcome.restored_claims.len()
                ))
            );
        } else {
            println!("{}", formatter.info(&format!("{} was already resolved", id)));
        }
    }
    if outcomes.is_empty() {
        println!("{}", formatter.info("Nothing to resolve"));
    }
    Ok(())
}

/// Execute the resolve-contradiction command.
pub fn execute_resolve_contradiction(
    args: ResolveContradictionArgs,
    store: &mut SqliteStore,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let resolution = ContradictionResolution {
        method: args.method.into(),
        explanation: args.explanation,
        resolver: args.resolver,
        resolved_at: now_millis(),
        tradeoff: args.tradeoff,
    };
    resolution.validate().map_err(CliError::InvalidInput)?;

    let id = ContradictionId::from(args.id.as_str());
    let mut engine = DefeaterEngine::new(config.defeater.clone());
    let outcome = engine.resolve_contradiction(store, &id, Some(resolution))?;

    println!(
        "{}",
        formatter.success(&format!(
            "Resolved contradiction {} ({} claim(s) restored)",
            id,
            outcome.restored_claims.len()
        ))
    );
    Ok(())
}

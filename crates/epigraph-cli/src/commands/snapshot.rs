//! Export and import of JSON graph snapshots.

use crate::cli::{ExportArgs, ImportArgs};
use crate::error::Result;
use crate::output::Formatter;
use epigraph_domain::{ClaimFilter, EvidenceGraph, EvidenceStore};
use epigraph_store::SqliteStore;
use std::fs;

/// Execute the export command.
pub fn execute_export(args: ExportArgs, store: &SqliteStore, formatter: &Formatter) -> Result<()> {
    let scope = args.status.map(|status| ClaimFilter::with_status(status.into()));
    let graph = store.get_full_graph(scope.as_ref())?;

    fs::write(&args.file, serde_json::to_string_pretty(&graph)?)?;
    println!(
        "{}",
        formatter.success(&format!(
            "Exported {} claim(s) and {} edge(s) to {}",
            graph.meta.claim_count, graph.meta.edge_count, args.file
        ))
    );
    Ok(())
}

/// Execute the import command.
pub fn execute_import(args: ImportArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    let content = fs::read_to_string(&args.file)?;
    let graph: EvidenceGraph = serde_json::from_str(&content)?;

    store.save_full_graph(&graph)?;
    println!(
        "{}",
        formatter.success(&format!(
            "Imported {} claim(s) and {} edge(s) from {}",
            graph.claims.len(),
            graph.edges.len(),
            args.file
        ))
    );
    Ok(())
}

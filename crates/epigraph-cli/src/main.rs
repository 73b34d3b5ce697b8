//! Epigraph CLI - Command-line interface for the Epigraph evidence graph.

use clap::Parser;
use epigraph_cli::commands;
use epigraph_cli::{Cli, Command, Config, Formatter};
use epigraph_store::SqliteStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> epigraph_cli::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    // Log to stderr so stdout stays clean for table/json output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    let db_path = cli.db.clone().unwrap_or_else(|| config.store.path.clone());
    tracing::debug!(path = %db_path, "Opening evidence store");
    let mut store = SqliteStore::open(&db_path)?;

    match cli.command {
        Command::Init(args) => commands::execute_init(args, &store, &config, &formatter)?,
        Command::Stats => commands::execute_stats(&store, &formatter)?,
        Command::Health => commands::execute_health(&store, &config, &formatter)?,
        Command::Claims(args) => commands::execute_claims(args, &store, &formatter)?,
        Command::Detect(args) => commands::execute_detect(args, &mut store, &config, &formatter)?,
        Command::Plan => commands::execute_plan(&store, &config, &formatter)?,
        Command::Resolve(args) => commands::execute_resolve(args, &mut store, &config, &formatter)?,
        Command::ResolveContradiction(args) => {
            commands::execute_resolve_contradiction(args, &mut store, &config, &formatter)?
        }
        Command::Export(args) => commands::execute_export(args, &store, &formatter)?,
        Command::Import(args) => commands::execute_import(args, &mut store, &formatter)?,
        Command::Outcome(args) => commands::execute_outcome(args, &mut store, &formatter)?,
        Command::Calibration(args) => commands::execute_calibration(args, &store, &formatter)?,
        Command::Watch(args) => commands::execute_watch(args, &mut store, &config, &formatter).await?,
    }

    Ok(())
}

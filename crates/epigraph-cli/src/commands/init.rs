//! Init command implementation.

use crate::cli::InitArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use epigraph_store::SqliteStore;

/// Execute the init command.
///
/// The schema is created when the store is opened, so this only reports on it
/// and optionally persists the active configuration.
pub fn execute_init(args: InitArgs, store: &SqliteStore, config: &Config, formatter: &Formatter) -> Result<()> {
    println!(
        "{}",
        formatter.success(&format!("Initialized evidence store at {}", store.path().display()))
    );

    if let Some(path) = args.write_config {
        config.save_to(&path)?;
        println!("{}", formatter.info(&format!("Wrote configuration to {}", path)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_config() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("graph.db")).unwrap();
        let config_path = dir.path().join("conf").join("config.toml");
        let formatter = Formatter::new(OutputFormat::Table, false);

        execute_init(
            InitArgs {
                write_config: Some(config_path.to_string_lossy().into_owned()),
            },
            &store,
            &Config::default(),
            &formatter,
        )
        .unwrap();

        assert!(dir.path().join("graph.db").exists());
        assert_eq!(Config::load_from(&config_path).unwrap(), Config::default());
    }
}

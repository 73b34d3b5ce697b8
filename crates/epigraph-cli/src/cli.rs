//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use epigraph_domain::{ClaimStatus, ResolutionMethod};

/// Epigraph CLI - Inspect and maintain an evidence graph.
#[derive(Debug, Parser)]
#[command(name = "epigraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Database path (overrides the configured store path)
    #[arg(long, global = true, env = "EPIGRAPH_DB")]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (IDs only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the database schema
    Init(InitArgs),

    /// Show graph statistics
    Stats,

    /// Assess graph health
    Health,

    /// List claims
    Claims(ClaimsArgs),

    /// Detect defeaters from events, optionally applying them
    Detect(DetectArgs),

    /// Show the remediation plan for active defeaters
    Plan,

    /// Resolve defeaters
    Resolve(ResolveArgs),

    /// Resolve a contradiction
    ResolveContradiction(ResolveContradictionArgs),

    /// Export the graph as a JSON snapshot
    Export(ExportArgs),

    /// Import a JSON snapshot
    Import(ImportArgs),

    /// Record whether a claim held up
    Outcome(OutcomeArgs),

    /// Show confidence calibration
    Calibration(CalibrationArgs),

    /// Run periodic defeater cycles
    Watch(WatchArgs),
}

/// Arguments for the init command.
#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Also write the active configuration to this path
    #[arg(long)]
    pub write_config: Option<String>,
}

/// Arguments for the claims command.
#[derive(Debug, Parser)]
pub struct ClaimsArgs {
    /// Filter by status
    #[arg(short, long, value_enum)]
    pub status: Option<StatusArg>,

    /// Filter by subject id
    #[arg(long)]
    pub subject: Option<String>,

    /// Minimum overall signal strength
    #[arg(long)]
    pub min_strength: Option<f64>,

    /// Maximum number of results
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for the detect command.
#[derive(Debug, Parser)]
pub struct DetectArgs {
    /// Changed file path (repeatable)
    #[arg(long = "changed-file")]
    pub changed_files: Vec<String>,

    /// Failed test id (repeatable)
    #[arg(long = "failed-test")]
    pub failed_tests: Vec<String>,

    /// Unavailable provider name (repeatable)
    #[arg(long = "unavailable-provider")]
    pub unavailable_providers: Vec<String>,

    /// Hash mismatch as CLAIM_ID:EXPECTED:ACTUAL (repeatable)
    #[arg(long = "hash-mismatch")]
    pub hash_mismatches: Vec<String>,

    /// JSON file of newly added claims to check for contradictions
    #[arg(long)]
    pub new_claims: Option<String>,

    /// Reference time (RFC 3339), defaults to now
    #[arg(long)]
    pub timestamp: Option<String>,

    /// Persist and apply what was detected
    #[arg(long)]
    pub apply: bool,
}

/// Arguments for the resolve command.
#[derive(Debug, Parser)]
pub struct ResolveArgs {
    /// Defeater IDs to resolve
    pub ids: Vec<String>,

    /// Resolve every active auto-resolvable defeater
    #[arg(long)]
    pub auto: bool,
}

/// Arguments for the resolve-contradiction command.
#[derive(Debug, Parser)]
pub struct ResolveContradictionArgs {
    /// Contradiction ID
    pub id: String,

    /// How the contradiction was settled
    #[arg(short, long, value_enum)]
    pub method: MethodArg,

    /// Why this method was chosen
    #[arg(short, long)]
    pub explanation: String,

    /// Who resolved it
    #[arg(short, long, env = "USER")]
    pub resolver: String,

    /// What was given up
    #[arg(short, long)]
    pub tradeoff: String,
}

/// Arguments for the export command.
#[derive(Debug, Parser)]
pub struct ExportArgs {
    /// Output file
    pub file: String,

    /// Only export claims with this status
    #[arg(short, long, value_enum)]
    pub status: Option<StatusArg>,
}

/// Arguments for the import command.
#[derive(Debug, Parser)]
pub struct ImportArgs {
    /// Snapshot file
    pub file: String,
}

/// Arguments for the outcome command.
#[derive(Debug, Parser)]
pub struct OutcomeArgs {
    /// Claim ID
    pub claim_id: String,

    /// The claim turned out to be wrong
    #[arg(long)]
    pub failed: bool,
}

/// Arguments for the calibration command.
#[derive(Debug, Parser)]
pub struct CalibrationArgs {
    /// Limit to one subject
    #[arg(short, long)]
    pub subject: Option<String>,

    /// Break the report down per subject
    #[arg(long, conflicts_with = "subject")]
    pub by_subject: bool,
}

/// Arguments for the watch command.
#[derive(Debug, Parser)]
pub struct WatchArgs {
    /// Stop after this many cycles (runs until Ctrl+C otherwise)
    #[arg(long)]
    pub cycles: Option<usize>,

    /// Seconds between cycles (overrides the configured interval)
    #[arg(long)]
    pub interval_secs: Option<u64>,
}

/// Claim status argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum StatusArg {
    /// Currently trusted
    Active,
    /// Needs revalidation
    Stale,
    /// Retracted by a defeater
    Defeated,
    /// In an unresolved contradiction
    Contradicted,
}

/// Contradiction resolution method argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum MethodArg {
    /// Claim A holds
    PreferA,
    /// Claim B holds
    PreferB,
    /// Both hold in different scopes
    BothValidInScope,
    /// One claim is an outdated version of the other
    Superseded,
    /// Neither claim holds
    RetractedBoth,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<StatusArg> for ClaimStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Active => ClaimStatus::Active,
            StatusArg::Stale => ClaimStatus::Stale,
            StatusArg::Defeated => ClaimStatus::Defeated,
            StatusArg::Contradicted => ClaimStatus::Contradicted,
        }
    }
}

impl From<MethodArg> for ResolutionMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::PreferA => ResolutionMethod::PreferA,
            MethodArg::PreferB => ResolutionMethod::PreferB,
            MethodArg::BothValidInScope => ResolutionMethod::BothValidInScope,
            MethodArg::Superseded => ResolutionMethod::Superseded,
            MethodArg::RetractedBoth => ResolutionMethod::RetractedBoth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_command() {
        let cli = Cli::parse_from([
            "epigraph",
            "detect",
            "--changed-file",
            "src/auth.rs",
            "--changed-file",
            "src/session.rs",
            "--failed-test",
            "tests::login",
            "--apply",
        ]);
        match cli.command {
            Command::Detect(args) => {
                assert_eq!(args.changed_files, vec!["src/auth.rs", "src/session.rs"]);
                assert_eq!(args.failed_tests, vec!["tests::login"]);
                assert!(args.apply);
            }
            other => panic!("Expected Detect command, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["epigraph", "stats", "--format", "json", "--db", "/tmp/g.db"]);
        assert!(matches!(cli.format, Some(CliFormat::Json)));
        assert_eq!(cli.db.as_deref(), Some("/tmp/g.db"));
        assert!(matches!(cli.command, Command::Stats));
    }

    #[test]
    fn test_resolve_contradiction_command() {
        let cli = Cli::parse_from([
            "epigraph",
            "resolve-contradiction",
            "c-1",
            "--method",
            "prefer-a",
            "--explanation",
            "A matches HEAD",
            "--resolver",
            "reviewer",
            "--tradeoff",
            "B described v1",
        ]);
        match cli.command {
            Command::ResolveContradiction(args) => {
                assert_eq!(ResolutionMethod::from(args.method), ResolutionMethod::PreferA);
                assert_eq!(args.resolver, "reviewer");
            }
            other => panic!("Expected ResolveContradiction command, got {:?}", other),
        }
    }

    #[test]
    fn test_status_conversion() {
        let status: ClaimStatus = StatusArg::Defeated.into();
        assert_eq!(status, ClaimStatus::Defeated);
    }

    #[test]
    fn test_calibration_flags_conflict() {
        let result = Cli::try_parse_from(["epigraph", "calibration", "--subject", "fn:a", "--by-subject"]);
        assert!(result.is_err());
    }
}

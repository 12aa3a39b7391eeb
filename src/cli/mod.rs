//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Default search query: every issue in the source.
pub const DEFAULT_QUERY: &str = "*";

/// Mapping-driven issue migration and sync between two trackers
#[derive(Parser, Debug)]
#[command(name = "tkb", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace directory (auto-discover .bridge if not set)
    #[arg(long, global = true)]
    pub bridge_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Flatten issues and their closure (parents, dependants)
    Issues(IssuesArgs),

    /// Create or update destination issues from source issues
    Sync(SyncArgs),

    /// Quarter report of destination Epics and their Features
    WorkItems(WorkItemsArgs),

    /// Validate and show a mapping table
    Mapping(MappingArgs),

    /// Show resolved configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Closure traversal overrides shared by `issues`, `sync` and `work-items`.
#[derive(Args, Debug, Clone, Default)]
pub struct ClosureArgs {
    /// Closure traversal depth (0 disables expansion)
    #[arg(long)]
    pub depth: Option<usize>,

    /// Concurrent fetchers during closure resolution
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct IssuesArgs {
    /// Search query (`*`, `key = K`, `key in (A, B)`, `project = P`, joined with AND)
    #[arg(long, short = 'Q', conflicts_with = "csv")]
    pub query: Option<String>,

    /// Read from the destination instance instead of the source
    #[arg(long)]
    pub destination: bool,

    /// Ingest a CSV export instead of searching the snapshot
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    #[command(flatten)]
    pub closure: ClosureArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Search query selecting the source issues
    #[arg(long, short = 'Q', conflicts_with = "csv")]
    pub query: Option<String>,

    /// Sync records from a CSV export instead of the source snapshot
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Build write requests without queuing them
    #[arg(long)]
    pub dry_run: bool,

    /// Outbox file receiving write requests (overrides destination.outbox)
    #[arg(long, value_name = "FILE")]
    pub outbox: Option<PathBuf>,

    #[command(flatten)]
    pub closure: ClosureArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct WorkItemsArgs {
    /// Reporting quarter, e.g. Q12025
    #[arg(long)]
    pub quarter: String,

    /// Destination search query (overrides work-items.query)
    #[arg(long, short = 'Q')]
    pub query: Option<String>,

    #[command(flatten)]
    pub closure: ClosureArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct MappingArgs {
    /// Show the destination mapping instead of the source mapping
    #[arg(long)]
    pub destination: bool,

    /// Print the JSON schema of the mapping file format
    #[arg(long)]
    pub schema: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Get a specific config value by key
    #[arg(long, short = 'g', value_name = "KEY", conflicts_with = "path")]
    pub get: Option<String>,

    /// Show config file paths
    #[arg(long, short = 'p')]
    pub path: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Supported shells for completion generation.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ShellType {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    #[value(name = "powershell")]
    #[value(alias = "pwsh")]
    /// `PowerShell`
    PowerShell,
    /// Elvish
    Elvish,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tkb", "sync", "--dry-run", "--json", "-vv", "-Q", "key = A-1"])
            .expect("parse");
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert!(args.dry_run);
        assert_eq!(args.query.as_deref(), Some("key = A-1"));
    }

    #[test]
    fn query_and_csv_conflict() {
        let result = Cli::try_parse_from(["tkb", "issues", "--query", "*", "--csv", "x.csv"]);
        assert!(result.is_err());
    }

    #[test]
    fn work_items_requires_quarter() {
        assert!(Cli::try_parse_from(["tkb", "work-items"]).is_err());
        let cli = Cli::try_parse_from(["tkb", "work-items", "--quarter", "Q32024", "--depth", "2"])
            .unwrap();
        let Commands::WorkItems(args) = cli.command else {
            panic!("expected work-items");
        };
        assert_eq!(args.quarter, "Q32024");
        assert_eq!(args.closure.depth, Some(2));
    }

    #[test]
    fn closure_overrides_parse() {
        let cli = Cli::try_parse_from(["tkb", "issues", "--depth", "3", "--workers", "2"]).unwrap();
        let Commands::Issues(args) = cli.command else {
            panic!("expected issues");
        };
        assert_eq!(args.closure.depth, Some(3));
        assert_eq!(args.closure.workers, Some(2));
    }
}

use clap::Parser;
use std::io::{self, IsTerminal};
use ticket_bridge::cli::commands::{self, CommandContext};
use ticket_bridge::cli::{Cli, Commands};
use ticket_bridge::logging::init_logging;
use ticket_bridge::{BridgeError, StructuredError};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let ctx = CommandContext {
        bridge_dir: cli.bridge_dir.clone(),
        json: cli.json,
        quiet: cli.quiet,
    };

    let result = match &cli.command {
        Commands::Issues(args) => commands::issues::execute(args, &ctx),
        Commands::Sync(args) => commands::sync::execute(args, &ctx),
        Commands::WorkItems(args) => commands::work_items::execute(args, &ctx),
        Commands::Mapping(args) => commands::mapping::execute(args, &ctx),
        Commands::Config(args) => commands::config::execute(args, &ctx),
        Commands::Completions(args) => commands::completions::execute(args, &ctx),
    };

    if let Err(e) = result {
        handle_error(&e, cli.json);
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs a human-readable error.
fn handle_error(err: &BridgeError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    if json_mode || !io::stdout().is_terminal() {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        eprintln!("{}", structured.to_human(io::stderr().is_terminal()));
    }

    std::process::exit(exit_code);
}

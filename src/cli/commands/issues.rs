//! `tkb issues`: flatten a query result and its closure.

use super::{CommandContext, collect_closure};
use crate::cli::{DEFAULT_QUERY, IssuesArgs};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::format::{render_table, terminal_width};
use tracing::info;

/// Execute the issues command.
///
/// # Errors
///
/// Returns an error if configuration, mapping, snapshot or CSV loading fails.
pub fn execute(args: &IssuesArgs, ctx: &CommandContext) -> Result<()> {
    let overrides = CliOverrides {
        closure_depth: args.closure.depth,
        closure_workers: args.closure.workers,
        ..CliOverrides::default()
    };
    let config = ctx.load_config(&overrides)?;
    let instance = if args.destination {
        &config.destination
    } else {
        &config.source
    };
    let table = instance.load_mapping()?;
    let query = args.query.as_deref().unwrap_or(DEFAULT_QUERY);

    let closure = collect_closure(instance, &table, query, args.csv.as_deref(), config.closure)?;
    info!(records = closure.len(), destination = args.destination, "Flattened issues");

    if ctx.json {
        return ctx.print_json(&closure);
    }
    if ctx.quiet {
        return Ok(());
    }
    if closure.is_empty() {
        println!("No issues found.");
        return Ok(());
    }
    print!("{}", render_table(&table.columns(), &closure, terminal_width()));
    println!("\n{} issue(s)", closure.len());
    Ok(())
}

//! `tkb sync`: push source issues to the destination.
//!
//! Source records are flattened with the source mapping and rebuilt with the
//! destination mapping; the shared camelCase keys connect the two. Writes go
//! to the destination outbox, or nowhere with `--dry-run`.

use super::{CommandContext, collect_closure};
use crate::cli::{DEFAULT_QUERY, SyncArgs};
use crate::client::{DryRun, IssueSink, Outbox, OutboxEntry};
use crate::config::CliOverrides;
use crate::error::{BridgeError, Result};
use crate::mapping::MappingTable;
use crate::model::{ClosureSet, WriteOperation};
use crate::sync::{DispatchedWrite, SyncReport, Synchronizer};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Serialize)]
struct SyncOutput<'a> {
    dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    outbox: Option<PathBuf>,
    #[serde(flatten)]
    report: &'a SyncReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    requests: Option<&'a [OutboxEntry]>,
}

/// Execute the sync command.
///
/// # Errors
///
/// Returns an error if loading fails, or the first reconstruction or write
/// error; writes before it stay queued.
pub fn execute(args: &SyncArgs, ctx: &CommandContext) -> Result<()> {
    let overrides = CliOverrides {
        closure_depth: args.closure.depth,
        closure_workers: args.closure.workers,
        outbox: args.outbox.clone(),
    };
    let config = ctx.load_config(&overrides)?;
    let source_table = config.source.load_mapping()?;
    let destination_table = config.destination.load_mapping()?;
    let query = args.query.as_deref().unwrap_or(DEFAULT_QUERY);

    let closure = collect_closure(
        &config.source,
        &source_table,
        query,
        args.csv.as_deref(),
        config.closure,
    )?;
    info!(records = closure.len(), dry_run = args.dry_run, "Synchronizing");

    if args.dry_run {
        let mut sink = DryRun::new();
        let report = run(&closure, &destination_table, &mut sink)?;
        return print_report(ctx, &SyncOutput {
            dry_run: true,
            outbox: None,
            report: &report,
            requests: Some(sink.entries()),
        });
    }

    let outbox_path = config
        .destination
        .outbox
        .clone()
        .ok_or_else(|| BridgeError::Config("destination.outbox is not set".to_string()))?;
    let mut sink = Outbox::open(&outbox_path)?;
    let report = run(&closure, &destination_table, &mut sink)?;
    print_report(ctx, &SyncOutput {
        dry_run: false,
        outbox: Some(outbox_path),
        report: &report,
        requests: None,
    })
}

fn run<W: IssueSink>(
    closure: &ClosureSet,
    table: &MappingTable,
    sink: &mut W,
) -> Result<SyncReport> {
    let mut synchronizer = Synchronizer::new(table, sink);
    if let Err(err) = synchronizer.run(closure) {
        let report = synchronizer.report();
        error!(
            written = report.written(),
            skipped = report.skipped,
            "Sync stopped; earlier writes were already dispatched"
        );
        return Err(err);
    }
    Ok(synchronizer.into_report())
}

fn print_report(ctx: &CommandContext, output: &SyncOutput<'_>) -> Result<()> {
    if ctx.json {
        return ctx.print_json(output);
    }
    if ctx.quiet {
        return Ok(());
    }

    let report = output.report;
    let verb = if output.dry_run { "Would write" } else { "Queued" };
    println!(
        "{verb} {} write(s): {} create, {} update; {} skipped (no linking id)",
        report.written(),
        report.created,
        report.updated,
        report.skipped
    );
    for write in &report.dispatched {
        match write.operation.target_key() {
            Some(target) => println!("  update {target} <- {}", write.source_key),
            None => println!("  create in {} <- {}", project_of(write), write.source_key),
        }
    }
    if let Some(path) = &output.outbox {
        println!("Outbox: {}", path.display());
    }
    Ok(())
}

fn project_of(write: &DispatchedWrite) -> &str {
    match &write.operation {
        WriteOperation::Create { project_key, .. } => project_key,
        WriteOperation::Update { .. } => "",
    }
}

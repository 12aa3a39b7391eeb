//! `tkb work-items`: quarter report of destination Epics.

use super::{CommandContext, collect_closure};
use crate::cli::WorkItemsArgs;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::format::{render_rows, terminal_width};
use crate::report::{Quarter, ReportSettings, WORK_ITEM_COLUMNS, WorkItem, build_work_items};
use tracing::info;

/// Execute the work-items command.
///
/// # Errors
///
/// Returns a validation error for a malformed quarter, or an error if the
/// configuration, destination mapping or snapshot cannot be loaded.
pub fn execute(args: &WorkItemsArgs, ctx: &CommandContext) -> Result<()> {
    let quarter = Quarter::parse(&args.quarter)?;

    let overrides = CliOverrides {
        closure_depth: args.closure.depth,
        closure_workers: args.closure.workers,
        ..CliOverrides::default()
    };
    let config = ctx.load_config(&overrides)?;
    let instance = &config.destination;
    let table = instance.load_mapping()?;
    let query = args.query.as_deref().unwrap_or(&config.work_items.query);

    let records = collect_closure(instance, &table, query, None, config.closure)?;
    let settings = ReportSettings {
        quarter_field: &config.work_items.quarter_field,
        base_url: instance.base_url.as_deref(),
    };
    let items = build_work_items(&records, &quarter, settings);
    info!(%quarter, records = records.len(), work_items = items.len(), "Work item report");

    if ctx.json {
        return ctx.print_json(&items);
    }
    if ctx.quiet {
        return Ok(());
    }
    if items.is_empty() {
        println!("No work items for {quarter}.");
        return Ok(());
    }
    print!("{}", render_report(&items, terminal_width()));
    println!("\n{} work item(s) for {quarter}", items.len());
    Ok(())
}

fn render_report(items: &[WorkItem], width: usize) -> String {
    let headers: Vec<&str> = WORK_ITEM_COLUMNS.iter().map(|column| column.header).collect();
    let rows: Vec<Vec<String>> = items.iter().map(WorkItem::cells).collect();
    render_rows(&headers, &rows, width)
}

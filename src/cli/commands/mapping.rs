//! `tkb mapping`: validate a mapping table and show the derived record keys.

use super::CommandContext;
use crate::cli::MappingArgs;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::format::truncate;
use crate::mapping::{FieldMapping, MappingTable};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Serialize)]
struct MappingRow<'a> {
    display_name: &'a str,
    key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attribute_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column_name: Option<&'a str>,
    data_type: String,
    read_only: bool,
    flags: Vec<String>,
}

impl<'a> MappingRow<'a> {
    fn new(mapping: &'a FieldMapping) -> Self {
        let mut flags = Vec::new();
        if mapping.is_parent_link {
            flags.push("parent-link".to_string());
        }
        if mapping.is_linking_id {
            flags.push("linking-id".to_string());
        }
        if let Some(link) = &mapping.issue_link {
            let side = if link.inward { "inward" } else { "outward" };
            let types: Vec<&str> = link.allowed_link_types.iter().map(String::as_str).collect();
            flags.push(format!("{side} links: {}", types.join(", ")));
        }

        Self {
            display_name: &mapping.display_name,
            key: &mapping.key,
            attribute_path: mapping.attribute_path.as_deref(),
            column_name: mapping.column_name.as_deref(),
            data_type: mapping.data_type.tag(),
            read_only: mapping.is_read_only(),
            flags,
        }
    }
}

/// Execute the mapping command.
///
/// # Errors
///
/// Returns an error if the configuration or mapping file cannot be loaded.
pub fn execute(args: &MappingArgs, ctx: &CommandContext) -> Result<()> {
    if args.schema {
        return ctx.print_json(&MappingTable::schema());
    }

    let config = ctx.load_config(&CliOverrides::default())?;
    let instance = if args.destination {
        &config.destination
    } else {
        &config.source
    };
    let table = instance.load_mapping()?;
    let rows: Vec<MappingRow<'_>> = table.iter().map(MappingRow::new).collect();

    if ctx.json {
        return ctx.print_json(&rows);
    }
    if ctx.quiet {
        return Ok(());
    }

    println!(
        "{} ({} fields)",
        instance.mapping_config.display(),
        table.len()
    );
    let name_width = rows
        .iter()
        .map(|row| UnicodeWidthStr::width(row.display_name))
        .max()
        .unwrap_or(0)
        .min(32);
    for row in &rows {
        let name = truncate(row.display_name, name_width);
        let padding = " ".repeat(name_width.saturating_sub(UnicodeWidthStr::width(name.as_str())));
        let source = row.attribute_path.or(row.column_name).unwrap_or("-");
        let mut line = format!("  {name}{padding}  {:<24} {:<28} {}", row.key, source, row.data_type);
        if !row.flags.is_empty() {
            line.push_str(&format!(" [{}]", row.flags.join("; ")));
        }
        println!("{}", line.trim_end());
    }
    Ok(())
}

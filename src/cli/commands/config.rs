//! `tkb config`: show the resolved configuration.

use super::CommandContext;
use crate::cli::ConfigArgs;
use crate::config::{self, BridgeConfig, CliOverrides, KNOWN_KEYS};
use crate::error::{BridgeError, Result};
use serde_json::json;
use std::env;
use std::path::PathBuf;
use tracing::debug;

/// Execute the config command.
///
/// # Errors
///
/// Returns an error if the workspace or its configuration cannot be loaded,
/// or `--get` names an unknown key.
pub fn execute(args: &ConfigArgs, ctx: &CommandContext) -> Result<()> {
    let bridge_dir = ctx.bridge_dir()?;

    if args.path {
        return show_paths(&bridge_dir, ctx);
    }

    let overrides = CliOverrides::default();
    let layer = config::load_config(&bridge_dir, &overrides)?;

    if let Some(key) = &args.get {
        if !KNOWN_KEYS.iter().any(|(known, _)| same_key(known, key)) {
            return Err(BridgeError::validation(
                "key",
                format!("unknown config key '{key}'"),
            ));
        }
        let value = layer.get(key);
        debug!(key, value = ?value, "Config lookup");
        if ctx.json {
            return ctx.print_json(&json!({ "key": key, "value": value }));
        }
        println!("{}", value.unwrap_or(""));
        return Ok(());
    }

    let resolved = BridgeConfig::from_layer(&bridge_dir, &layer)?;
    if ctx.json {
        return ctx.print_json(&resolved);
    }
    if ctx.quiet {
        return Ok(());
    }

    println!("bridge dir: {}", resolved.bridge_dir.display());
    for (name, instance) in [("source", &resolved.source), ("destination", &resolved.destination)] {
        println!("{name}:");
        println!("  mapping-config: {}", instance.mapping_config.display());
        println!("  snapshot: {}", instance.snapshot.display());
        if let Some(folder) = &instance.data_folder {
            println!("  data-folder: {}", folder.display());
        }
        if let Some(outbox) = &instance.outbox {
            println!("  outbox: {}", outbox.display());
        }
        if let Some(url) = &instance.base_url {
            println!("  base-url: {url}");
        }
    }
    println!("closure:");
    println!("  depth: {}", resolved.closure.depth);
    println!("  workers: {}", resolved.closure.workers);
    println!("work-items:");
    println!("  query: {}", resolved.work_items.query);
    println!("  quarter-field: {}", resolved.work_items.quarter_field);
    Ok(())
}

fn show_paths(bridge_dir: &std::path::Path, ctx: &CommandContext) -> Result<()> {
    let project = bridge_dir.join("config.yaml");
    let user = env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config").join("tkb").join("config.yaml"));

    if ctx.json {
        return ctx.print_json(&json!({
            "bridge_dir": bridge_dir,
            "project": project,
            "user": user,
        }));
    }
    println!("project: {}", project.display());
    if let Some(user) = user {
        println!("user: {}", user.display());
    }
    Ok(())
}

fn same_key(a: &str, b: &str) -> bool {
    let normalize = |key: &str| key.trim().to_lowercase().replace(['_', '.'], "-");
    normalize(a) == normalize(b)
}

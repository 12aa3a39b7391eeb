//! Command implementations.

pub mod completions;
pub mod config;
pub mod issues;
pub mod mapping;
pub mod sync;
pub mod work_items;

use crate::closure::{self, ClosureOptions, ClosureResolver};
use crate::config::{BridgeConfig, CliOverrides, InstanceConfig, discover_bridge_dir};
use crate::error::{BridgeError, Result};
use crate::format::CsvTable;
use crate::mapping::MappingTable;
use crate::model::ClosureSet;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Global flags every command sees.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub bridge_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl CommandContext {
    /// Locate the workspace: `--bridge-dir`, then discovery.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` when no workspace exists.
    pub fn bridge_dir(&self) -> Result<PathBuf> {
        match &self.bridge_dir {
            Some(dir) if dir.is_dir() => Ok(dir.clone()),
            Some(dir) => Err(BridgeError::Config(format!(
                "bridge directory '{}' does not exist",
                dir.display()
            ))),
            None => discover_bridge_dir(None),
        }
    }

    /// Locate the workspace and resolve its configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the workspace or its config cannot be loaded.
    pub fn load_config(&self, overrides: &CliOverrides) -> Result<BridgeConfig> {
        let bridge_dir = self.bridge_dir()?;
        BridgeConfig::load(&bridge_dir, overrides)
    }

    /// Print a value as pretty JSON on stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Build the closure set a command works on.
///
/// With `csv`, rows from the file seed the set and referenced issues come
/// from the instance snapshot when it exists. Otherwise the snapshot is
/// searched with `query`.
pub(crate) fn collect_closure(
    instance: &InstanceConfig,
    table: &MappingTable,
    query: &str,
    csv: Option<&Path>,
    options: ClosureOptions,
) -> Result<ClosureSet> {
    let Some(csv) = csv else {
        let source = instance.open_snapshot()?;
        return closure::fetch_closure(&source, table, query, options);
    };

    let path = instance.resolve_data_file(csv);
    let records = CsvTable::read(&path)?.to_records(table);
    let mut set = closure::seed_from_records(records);
    debug!(path = %path.display(), seeds = set.len(), "Seeded closure from CSV");

    if instance.snapshot.is_file() {
        let source = instance.open_snapshot()?;
        ClosureResolver::new(&source, table)
            .with_options(options)
            .resolve(&mut set);
    } else if options.depth > 0 {
        warn!(
            snapshot = %instance.snapshot.display(),
            "Snapshot not found, referenced issues are not resolved"
        );
    }
    Ok(set)
}

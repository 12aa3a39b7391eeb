//! Configuration management for `ticket_bridge`.
//!
//! Precedence (lowest to highest):
//! defaults, user config (`~/.config/tkb/config.yaml`), project config
//! (`.bridge/config.yaml`), environment (`TKB_*`), CLI overrides.
//!
//! Keys are dotted (`source.mapping-config`). Lookups treat `.`, `-` and `_`
//! as the same separator, so `TKB_SOURCE_MAPPING_CONFIG` sets
//! `source.mapping-config`.

use crate::client::SnapshotStore;
use crate::closure::{ClosureOptions, DEFAULT_DEPTH, DEFAULT_WORKERS};
use crate::error::{BridgeError, Result};
use crate::mapping::MappingTable;
use crate::report::DEFAULT_QUARTER_FIELD;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the workspace directory.
pub const BRIDGE_DIR_NAME: &str = ".bridge";
/// Environment variable naming the workspace directory directly.
pub const BRIDGE_DIR_ENV: &str = "BRIDGE_DIR";
const ENV_PREFIX: &str = "TKB_";
const CONFIG_FILENAME: &str = "config.yaml";

/// Known keys with their defaults.
pub const KNOWN_KEYS: &[(&str, Option<&str>)] = &[
    ("source.mapping-config", Some("mappings/source.yaml")),
    ("source.snapshot", Some("source.jsonl")),
    ("source.data-folder", None),
    ("destination.mapping-config", Some("mappings/destination.yaml")),
    ("destination.snapshot", Some("destination.jsonl")),
    ("destination.outbox", Some("outbox.jsonl")),
    ("destination.base-url", None),
    ("closure.depth", Some("1")),
    ("closure.workers", Some("4")),
    ("work-items.query", Some("*")),
    ("work-items.quarter-field", Some("quarter")),
];

/// Discover the active `.bridge` directory.
///
/// Honors `BRIDGE_DIR` when set, otherwise walks up from `start` (or CWD).
///
/// # Errors
///
/// Returns `NotInitialized` if no workspace is found, or an error if the CWD
/// cannot be read.
pub fn discover_bridge_dir(start: Option<&Path>) -> Result<PathBuf> {
    let from_env = env::var(BRIDGE_DIR_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);
    discover_bridge_dir_with_env(start, from_env.as_deref())
}

fn discover_bridge_dir_with_env(start: Option<&Path>, env_override: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = env_override {
        if path.is_dir() {
            return Ok(path.to_path_buf());
        }
    }

    let mut current = match start {
        Some(path) => path.to_path_buf(),
        None => env::current_dir()?,
    };

    loop {
        let candidate = current.join(BRIDGE_DIR_NAME);
        if candidate.is_dir() {
            return Ok(candidate);
        }
        if !current.pop() {
            break;
        }
    }

    Err(BridgeError::NotInitialized)
}

/// One layer of flat key/value configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Set a key; later sets win.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Build a layer from YAML text; nested mappings become dotted keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let mut flat = HashMap::new();
        flatten_yaml(&value, "", &mut flat);

        let mut layer = Self::default();
        for (key, value) in flat {
            layer.set(&key, value);
        }
        Ok(layer)
    }

    /// Build a layer from `TKB_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut layer = Self::default();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.set(stripped, value);
            }
        }
        layer
    }

    /// All keys and values, sorted by key.
    #[must_use]
    pub fn entries(&self) -> BTreeMap<&str, &str> {
        self.values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub closure_depth: Option<usize>,
    pub closure_workers: Option<usize>,
    pub outbox: Option<PathBuf>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();
        if let Some(depth) = self.closure_depth {
            layer.set("closure.depth", depth.to_string());
        }
        if let Some(workers) = self.closure_workers {
            layer.set("closure.workers", workers.to_string());
        }
        if let Some(path) = &self.outbox {
            layer.set("destination.outbox", path.to_string_lossy());
        }
        layer
    }
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    for (key, default) in KNOWN_KEYS {
        if let Some(value) = default {
            layer.set(key, *value);
        }
    }
    layer
}

/// Load project config (`.bridge/config.yaml`).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(bridge_dir: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&bridge_dir.join(CONFIG_FILENAME))
}

/// Load user config (`~/.config/tkb/config.yaml`).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("tkb")
        .join(CONFIG_FILENAME);
    ConfigLayer::from_yaml(&path)
}

/// Load configuration with full precedence order.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_config(bridge_dir: &Path, cli: &CliOverrides) -> Result<ConfigLayer> {
    let merged = ConfigLayer::merge_layers(&[
        default_config_layer(),
        load_user_config()?,
        load_project_config(bridge_dir)?,
        ConfigLayer::from_env(),
        cli.as_layer(),
    ]);
    debug!(bridge_dir = %bridge_dir.display(), keys = merged.values.len(), "Loaded configuration");
    Ok(merged)
}

/// Settings for one tracker instance, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceConfig {
    pub mapping_config: PathBuf,
    pub snapshot: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_folder: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbox: Option<PathBuf>,
    /// Web address of the tracker, used for report links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl InstanceConfig {
    fn from_layer(layer: &ConfigLayer, prefix: &str, bridge_dir: &Path) -> Result<Self> {
        let path = |name: &str| {
            layer
                .get(&format!("{prefix}.{name}"))
                .filter(|value| !value.trim().is_empty())
                .map(|value| resolve_path(bridge_dir, value))
        };
        let required = |name: &str| {
            path(name).ok_or_else(|| BridgeError::Config(format!("{prefix}.{name} is not set")))
        };

        Ok(Self {
            mapping_config: required("mapping-config")?,
            snapshot: required("snapshot")?,
            data_folder: path("data-folder"),
            outbox: path("outbox"),
            base_url: layer
                .get(&format!("{prefix}.base-url"))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        })
    }

    /// Load this instance's mapping table.
    ///
    /// # Errors
    ///
    /// Returns an error if the mapping file is missing or invalid.
    pub fn load_mapping(&self) -> Result<MappingTable> {
        MappingTable::load(&self.mapping_config)
    }

    /// Open this instance's issue snapshot as a source.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot is missing or malformed.
    pub fn open_snapshot(&self) -> Result<SnapshotStore> {
        SnapshotStore::open(&self.snapshot)
    }

    /// Resolve a CSV file name against the data folder when it is relative.
    #[must_use]
    pub fn resolve_data_file(&self, file: &Path) -> PathBuf {
        match &self.data_folder {
            Some(folder) if file.is_relative() && !file.exists() => folder.join(file),
            _ => file.to_path_buf(),
        }
    }
}

/// Quarter report settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItemOptions {
    /// Destination search selecting the report's issues.
    pub query: String,
    /// Record key holding an Epic's quarter.
    pub quarter_field: String,
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeConfig {
    pub bridge_dir: PathBuf,
    pub source: InstanceConfig,
    pub destination: InstanceConfig,
    pub closure: ClosureOptions,
    pub work_items: WorkItemOptions,
}

impl BridgeConfig {
    /// Load every layer for `bridge_dir` and resolve it.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is unreadable or a value is invalid.
    pub fn load(bridge_dir: &Path, cli: &CliOverrides) -> Result<Self> {
        let layer = load_config(bridge_dir, cli)?;
        Self::from_layer(bridge_dir, &layer)
    }

    /// Resolve a merged layer.
    ///
    /// # Errors
    ///
    /// Returns an error if a required key is missing or a number is invalid.
    pub fn from_layer(bridge_dir: &Path, layer: &ConfigLayer) -> Result<Self> {
        let depth = parse_usize(layer, "closure.depth")?.unwrap_or(DEFAULT_DEPTH);
        let workers = parse_usize(layer, "closure.workers")?.unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(BridgeError::Config("closure.workers must be at least 1".to_string()));
        }

        Ok(Self {
            bridge_dir: bridge_dir.to_path_buf(),
            source: InstanceConfig::from_layer(layer, "source", bridge_dir)?,
            destination: InstanceConfig::from_layer(layer, "destination", bridge_dir)?,
            closure: ClosureOptions { depth, workers },
            work_items: WorkItemOptions {
                query: text_or(layer, "work-items.query", "*"),
                quarter_field: text_or(layer, "work-items.quarter-field", DEFAULT_QUARTER_FIELD),
            },
        })
    }
}

fn parse_usize(layer: &ConfigLayer, key: &str) -> Result<Option<usize>> {
    layer
        .get(key)
        .map(|value| {
            value.trim().parse::<usize>().map_err(|_| {
                BridgeError::Config(format!("{key} must be a non-negative integer, got '{value}'"))
            })
        })
        .transpose()
}

fn text_or(layer: &ConfigLayer, key: &str, default: &str) -> String {
    layer
        .get(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn resolve_path(bridge_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value.trim());
    if path.is_absolute() {
        path
    } else {
        bridge_dir.join(path)
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace(['_', '.'], "-")
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Sequence(values) => {
            let joined = values
                .iter()
                .filter_map(yaml_scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null | serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => {
            None
        }
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}

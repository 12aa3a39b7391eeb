//! Field-mapping table.
//!
//! The mapping YAML is the operator contract: display name to
//! `{ issueAttributeName, issueColumnName, dataType, isParentLink, isLinkingId,
//! issueLink: { isInward, linkTypes } }`, optionally wrapped in a
//! `jiraFieldMappings` key. It is parsed once at startup into an ordered,
//! immutable [`MappingTable`] that every engine borrows.

use crate::error::{BridgeError, Result};
use crate::util::{DatePattern, to_camel_case};
use schemars::JsonSchema;
use schemars::schema::RootSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Top-level key of the mapping document.
pub const MAPPINGS_ROOT_KEY: &str = "jiraFieldMappings";

const FIELDS_PREFIX: &str = "fields.";

/// One mapping entry as written by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldMappingSpec {
    /// Dotted path into the raw issue JSON (`fields.summary`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_attribute_name: Option<String>,
    /// CSV header used by file ingestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_column_name: Option<String>,
    /// `String`, `String[]`, `DateAsString[pattern]` or a custom tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Holds the key of the parent issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_parent_link: Option<bool>,
    /// Holds the cross-instance linking id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_linking_id: Option<bool>,
    /// Derive the value from the issue's link list instead of an attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_link: Option<IssueLinkMappingSpec>,
}

/// Issue-link selection as written by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IssueLinkMappingSpec {
    /// Inspect the inward side of each link instead of the outward side.
    #[serde(default, alias = "inward")]
    pub is_inward: bool,
    /// Link type labels (`blocks`, `is blocked by`) to collect.
    #[serde(default)]
    pub link_types: Vec<String>,
}

/// Whole mapping document, used for schema output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MappingDocument {
    #[serde(rename = "jiraFieldMappings")]
    pub jira_field_mappings: BTreeMap<String, FieldMappingSpec>,
}

/// Value coercion rule of a mapping entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// Raw text (also the default when no tag is given).
    String,
    /// Multi-valued; each element is raw text.
    StringList,
    /// Parsed and re-rendered with the pattern, raw text when it does not parse.
    DateAsString(DatePattern),
    /// Unknown tag, treated as raw text.
    Custom(String),
}

impl DataType {
    /// Classify a `dataType` tag.
    #[must_use]
    pub fn parse(tag: Option<&str>) -> Self {
        let Some(tag) = tag.map(str::trim).filter(|tag| !tag.is_empty()) else {
            return Self::String;
        };

        if tag.starts_with("String[]") {
            return Self::StringList;
        }
        if tag.starts_with("String") && !tag.starts_with("String[") {
            return Self::String;
        }
        if let Some(rest) = tag.strip_prefix("DateAsString") {
            let pattern = rest
                .find('[')
                .and_then(|open| rest[open + 1..].find(']').map(|len| &rest[open + 1..open + 1 + len]));
            if let Some(pattern) = pattern {
                return Self::DateAsString(DatePattern::new(pattern));
            }
        }
        Self::Custom(tag.to_string())
    }

    /// Multi-valued entries collect a list.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::StringList)
    }

    /// Apply the coercion rule to one raw value. Never fails.
    #[must_use]
    pub fn coerce(&self, raw: &str) -> String {
        match self {
            Self::DateAsString(pattern) => pattern.normalize(raw),
            Self::String | Self::StringList | Self::Custom(_) => raw.to_string(),
        }
    }

    /// Tag as it would be written in a mapping file.
    #[must_use]
    pub fn tag(&self) -> String {
        match self {
            Self::String => "String".to_string(),
            Self::StringList => "String[]".to_string(),
            Self::DateAsString(pattern) => format!("DateAsString[{}]", pattern.as_str()),
            Self::Custom(tag) => tag.clone(),
        }
    }
}

/// Issue-link selection for a derived list field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueLinkSpec {
    pub inward: bool,
    pub allowed_link_types: BTreeSet<String>,
}

/// A validated mapping entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub display_name: String,
    /// camelCase key in flat records.
    pub key: String,
    pub attribute_path: Option<String>,
    pub column_name: Option<String>,
    pub data_type: DataType,
    pub is_parent_link: bool,
    pub is_linking_id: bool,
    pub issue_link: Option<IssueLinkSpec>,
}

impl FieldMapping {
    fn from_spec(display_name: &str, spec: FieldMappingSpec) -> Result<Self> {
        if let Some(path) = &spec.issue_attribute_name {
            if path.trim().is_empty() || path.split('.').any(str::is_empty) {
                return Err(BridgeError::invalid_mapping(
                    display_name,
                    format!("issueAttributeName '{path}' is not a dotted path"),
                ));
            }
        }

        let issue_link = spec.issue_link.map(|link| {
            if link.link_types.is_empty() {
                warn!(field = %display_name, "issueLink has no linkTypes; it will always be empty");
            }
            IssueLinkSpec {
                inward: link.is_inward,
                allowed_link_types: link.link_types.into_iter().collect(),
            }
        });

        Ok(Self {
            display_name: display_name.to_string(),
            key: to_camel_case(display_name),
            attribute_path: spec.issue_attribute_name,
            column_name: spec
                .issue_column_name
                .filter(|column| !column.trim().is_empty()),
            data_type: DataType::parse(spec.data_type.as_deref()),
            is_parent_link: spec.is_parent_link.unwrap_or(false),
            is_linking_id: spec.is_linking_id.unwrap_or(false),
            issue_link,
        })
    }

    /// Linking ids, parent links and issue-link lists are read-only: they are
    /// derived from the source and never written back.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.is_linking_id || self.is_parent_link || self.issue_link.is_some()
    }

    /// Attribute path relative to the payload's `fields` object.
    #[must_use]
    pub fn payload_path(&self) -> Option<&str> {
        self.attribute_path
            .as_deref()
            .map(|path| path.strip_prefix(FIELDS_PREFIX).unwrap_or(path))
    }
}

/// Ordered, immutable mapping table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: Vec<FieldMapping>,
}

impl MappingTable {
    /// Load a mapping YAML file.
    ///
    /// # Errors
    ///
    /// Returns `MappingNotFound` if the file is missing, or a YAML/mapping
    /// error if it does not follow the operator contract.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(BridgeError::MappingNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = fs::read_to_string(path)?;
        let table = Self::from_yaml_str(&contents)?;
        debug!(path = %path.display(), entries = table.len(), "Loaded mapping table");
        Ok(table)
    }

    /// Parse a mapping document, keeping entry order.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed YAML, non-string display names,
    /// invalid attribute paths, or two display names with the same key.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let document: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let root = match &document {
            serde_yaml::Value::Null => return Ok(Self::default()),
            serde_yaml::Value::Mapping(map) => map
                .get(MAPPINGS_ROOT_KEY)
                .map_or(&document, |inner| inner),
            _ => {
                return Err(BridgeError::Config(
                    "mapping document must be a YAML mapping".to_string(),
                ));
            }
        };

        let serde_yaml::Value::Mapping(map) = root else {
            return Err(BridgeError::Config(format!(
                "'{MAPPINGS_ROOT_KEY}' must be a mapping of display names"
            )));
        };

        let mut specs = Vec::with_capacity(map.len());
        for (name, value) in map {
            let Some(display_name) = name.as_str() else {
                return Err(BridgeError::Config(format!(
                    "mapping display names must be strings, found {name:?}"
                )));
            };
            let spec: FieldMappingSpec = if value.is_null() {
                FieldMappingSpec::default()
            } else {
                serde_yaml::from_value(value.clone()).map_err(|err| {
                    BridgeError::invalid_mapping(display_name, err.to_string())
                })?
            };
            specs.push((display_name.to_string(), spec));
        }

        Self::from_specs(specs)
    }

    /// Build a table from already-parsed entries, in order.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid attribute paths or key collisions.
    pub fn from_specs<I, S>(specs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, FieldMappingSpec)>,
        S: AsRef<str>,
    {
        let mut entries = Vec::new();
        let mut seen: HashMap<String, String> = HashMap::new();

        for (name, spec) in specs {
            let mapping = FieldMapping::from_spec(name.as_ref(), spec)?;
            if let Some(previous) = seen.insert(mapping.key.clone(), mapping.display_name.clone())
            {
                return Err(BridgeError::invalid_mapping(
                    &mapping.display_name,
                    format!("record key '{}' is already used by '{previous}'", mapping.key),
                ));
            }
            entries.push(mapping);
        }

        Ok(Self { entries })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldMapping> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by display name.
    #[must_use]
    pub fn get(&self, display_name: &str) -> Option<&FieldMapping> {
        self.entries.iter().find(|m| m.display_name == display_name)
    }

    /// Look up an entry by flat-record key.
    #[must_use]
    pub fn by_key(&self, key: &str) -> Option<&FieldMapping> {
        self.entries.iter().find(|m| m.key == key)
    }

    /// Column descriptor for tabular output: (record key, header).
    #[must_use]
    pub fn columns(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|m| (m.key.as_str(), m.display_name.as_str()))
            .collect()
    }

    /// JSON schema of the mapping document.
    #[must_use]
    pub fn schema() -> RootSchema {
        schemars::schema_for!(MappingDocument)
    }
}

impl<'a> IntoIterator for &'a MappingTable {
    type Item = &'a FieldMapping;
    type IntoIter = std::slice::Iter<'a, FieldMapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

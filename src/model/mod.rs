//! Core data types for `ticket_bridge`.
//!
//! - `FieldValue` - One value in a canonical flat record
//! - `FlatRecord` - Mapping-driven, camelCase-keyed view of an issue
//! - `ClosureSet` - Flat records keyed by issue key
//! - `SyncDirective` - Create/update decision derived from the linking id
//! - `WriteRequest` - Payload plus operation handed to the write collaborator

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::util::is_blank;

/// Record keys with fixed meaning across the engine.
pub mod keys {
    /// Source issue key; on a record headed to the destination, the target key.
    pub const ISSUE_KEY: &str = "issueKey";
    /// Destination project for creates.
    pub const PROJECT_KEY: &str = "projectKey";
    /// Issue type name used on create.
    pub const ISSUE_TYPE: &str = "issueType";
    /// Parent issue key, followed by closure resolution.
    pub const PARENT_LINK: &str = "parentLink";
    /// Linked issue keys, followed by closure resolution.
    pub const DEPENDANT_ISSUES: &str = "dependantIssues";
    /// Display name of the reserved cross-instance linking field.
    pub const LINKING_ID_DISPLAY_NAME: &str = "External Linking ID";
    /// Issue type written on create when the record names none.
    pub const DEFAULT_ISSUE_TYPE: &str = "Epic";
}

/// A value in a flat record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Flag(bool),
}

impl FieldValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::List(_) | Self::Flag(_) => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            Self::Text(_) | Self::Flag(_) => None,
        }
    }

    /// JSON form used inside write payloads.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::List(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
            Self::Flag(flag) => Value::Bool(*flag),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::List(items) => write!(f, "{}", items.join(", ")),
            Self::Flag(flag) => write!(f, "{flag}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// Canonical flat record: camelCase key to value.
///
/// A missing key means "not set"; flattening never stores empty placeholders
/// except for issue-link lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRecord(BTreeMap<String, FieldValue>);

impl FlatRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.0.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Text value for `key`, if present and textual.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_text)
    }

    /// Trimmed text value for `key`, skipping blank values.
    #[must_use]
    pub fn non_blank_text(&self, key: &str) -> Option<&str> {
        self.text(key)
            .filter(|value| !is_blank(value))
            .map(str::trim)
    }

    /// List value for `key`, if present and a list.
    #[must_use]
    pub fn list(&self, key: &str) -> Option<&[String]> {
        self.get(key).and_then(FieldValue::as_list)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FlatRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Flat records keyed by issue key.
pub type ClosureSet = BTreeMap<String, FlatRecord>;

/// Create/update decision for one source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum SyncDirective {
    /// Create a new destination issue in `project_key`.
    Create {
        project_key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        issue_type: Option<String>,
    },
    /// Update the existing destination issue `target_key`.
    Update { target_key: String },
}

/// The operation of a reconstructed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteOperation {
    Create {
        project_key: String,
        issue_type: String,
    },
    Update {
        issue_key: String,
    },
}

impl WriteOperation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
        }
    }

    /// Destination key for updates.
    #[must_use]
    pub fn target_key(&self) -> Option<&str> {
        match self {
            Self::Create { .. } => None,
            Self::Update { issue_key } => Some(issue_key),
        }
    }
}

/// A write payload ready for the write collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteRequest {
    #[serde(flatten)]
    pub operation: WriteOperation,
    /// `{ "fields": { ... } }`
    pub payload: Value,
}

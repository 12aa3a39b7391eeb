//! JSONL snapshot served as an issue source.
//!
//! One raw issue object per line, in the tracker's REST shape
//! (`{ "key": ..., "fields": { ... } }`). Blank lines are ignored.

use super::IssueSource;
use crate::error::{BridgeError, Result};
use crate::util::json_path;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static AND_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+AND\s+").expect("valid regex"));
static KEY_EQ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)^key\s*=\s*("[^"]*"|'[^']*'|\S+)$"#).expect("valid regex"));
static KEY_IN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^key\s+in\s*\(([^)]*)\)$").expect("valid regex"));
static PROJECT_EQ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^project\s*=\s*("[^"]*"|'[^']*'|\S+)$"#).expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    KeyIn(Vec<String>),
    Project(String),
}

impl Clause {
    fn matches(&self, issue: &Value) -> bool {
        let key = issue.get("key").and_then(Value::as_str).unwrap_or_default();
        match self {
            Self::KeyIn(keys) => keys.iter().any(|k| k == key),
            Self::Project(project) => {
                let from_fields = json_path::resolve(issue, "fields.project.key").and_then(Value::as_str);
                let from_key = key.split_once('-').map(|(prefix, _)| prefix);
                from_fields
                    .or(from_key)
                    .is_some_and(|p| p.eq_ignore_ascii_case(project))
            }
        }
    }
}

/// Parsed search query.
///
/// Supported: empty or `*`, `key = K`, `key in (A, B)`, `project = P`,
/// joined with `AND`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    clauses: Vec<Clause>,
}

impl SearchQuery {
    /// Parse a query string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` for clauses outside the supported subset.
    pub fn parse(query: &str) -> Result<Self> {
        let trimmed = query.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::default());
        }

        let invalid = |reason: String| BridgeError::InvalidQuery {
            query: query.to_string(),
            reason,
        };

        let mut clauses = Vec::new();
        for part in AND_SPLIT.split(trimmed).map(str::trim) {
            if let Some(caps) = KEY_EQ.captures(part) {
                clauses.push(Clause::KeyIn(vec![unquote(&caps[1]).to_string()]));
            } else if let Some(caps) = KEY_IN.captures(part) {
                let keys: Vec<String> = caps[1]
                    .split(',')
                    .map(|k| unquote(k.trim()).to_string())
                    .filter(|k| !k.is_empty())
                    .collect();
                if keys.is_empty() {
                    return Err(invalid("empty key list".to_string()));
                }
                clauses.push(Clause::KeyIn(keys));
            } else if let Some(caps) = PROJECT_EQ.captures(part) {
                clauses.push(Clause::Project(unquote(&caps[1]).to_string()));
            } else {
                return Err(invalid(format!("unsupported clause '{part}'")));
            }
        }

        Ok(Self { clauses })
    }

    /// True when the query selects every issue.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.clauses.is_empty()
    }

    #[must_use]
    pub fn matches(&self, issue: &Value) -> bool {
        self.clauses.iter().all(|clause| clause.matches(issue))
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}

/// In-memory issue store loaded from a JSONL snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    issues: Vec<Value>,
    index: HashMap<String, usize>,
}

impl SnapshotStore {
    /// Load a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or `JsonlParse` naming the
    /// first line that is not an issue object with a string `key`.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(BridgeError::Config(format!(
                "issue snapshot not found at '{}'",
                path.display()
            )));
        }
        let reader = BufReader::new(File::open(path)?);
        let mut issues = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let issue: Value = serde_json::from_str(&line).map_err(|e| BridgeError::JsonlParse {
                line: line_num + 1,
                reason: e.to_string(),
            })?;
            if issue.get("key").and_then(Value::as_str).is_none() {
                return Err(BridgeError::JsonlParse {
                    line: line_num + 1,
                    reason: "issue has no string 'key'".to_string(),
                });
            }
            issues.push(issue);
        }

        let store = Self::from_issues(issues);
        debug!(path = %path.display(), issues = store.len(), "Loaded issue snapshot");
        Ok(store)
    }

    /// Build a store from raw issues; a later duplicate key replaces an earlier one.
    #[must_use]
    pub fn from_issues(issues: Vec<Value>) -> Self {
        let mut store = Self::default();
        for issue in issues {
            let Some(key) = issue.get("key").and_then(Value::as_str).map(str::to_string) else {
                continue;
            };
            if let Some(&position) = store.index.get(&key) {
                store.issues[position] = issue;
            } else {
                store.index.insert(key, store.issues.len());
                store.issues.push(issue);
            }
        }
        store
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl IssueSource for SnapshotStore {
    fn fetch_issue(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.index.get(key).map(|&position| self.issues[position].clone()))
    }

    fn search(&self, query: &str) -> Result<Vec<Value>> {
        let query = SearchQuery::parse(query)?;
        Ok(self
            .issues
            .iter()
            .filter(|issue| query.matches(issue))
            .cloned()
            .collect())
    }
}

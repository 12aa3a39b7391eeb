//! Quarter work-item report over destination records.
//!
//! Every Epic planned for the quarter becomes one [`WorkItem`], enriched with
//! its parent Feature when that Feature is part of the same record set. The
//! columns are declared once in [`WORK_ITEM_COLUMNS`]; JSON field names and
//! text headers both follow it.

use crate::error::{BridgeError, Result};
use crate::model::{ClosureSet, FieldValue, FlatRecord, keys};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

static QUARTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Q[1-4]\d{4}$").expect("valid regex"));

/// Placeholder for feature details that cannot be found.
pub const NONE_PLACEHOLDER: &str = "[None]";
/// Status shown when an Epic has none.
pub const DEFAULT_STATUS: &str = "Not started";
/// Record key holding the quarter an Epic is planned for, unless configured.
pub const DEFAULT_QUARTER_FIELD: &str = "quarter";

const SUMMARY: &str = "summary";
const STATUS: &str = "status";
const FEATURE_PRIORITY: &str = "featurePriority";
const PLANNED: &str = "plannedUnplanned";
const STORY_POINTS: &str = "storyPoints";
const RISK_FINDING_IDS: &str = "riskFindingIds";

/// A reporting quarter such as `Q12025`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quarter(String);

impl Quarter {
    /// # Errors
    ///
    /// Returns a validation error unless `text` is `Q<1-4><year>`.
    pub fn parse(text: &str) -> Result<Self> {
        if QUARTER_PATTERN.is_match(text) {
            Ok(Self(text.to_string()))
        } else {
            Err(BridgeError::validation(
                "quarter",
                format!("'{text}' is not a quarter like Q12025"),
            ))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One report row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkItem {
    #[serde(rename = "Feature Priority")]
    pub feature_priority: String,
    #[serde(rename = "Feature Name")]
    pub feature_name: String,
    #[serde(rename = "Epic Name")]
    pub epic_name: String,
    #[serde(rename = "Epic Link")]
    pub epic_link: String,
    #[serde(rename = "Risk Finding Ids")]
    pub risk_finding_ids: Vec<String>,
    #[serde(rename = "Planned")]
    pub planned: bool,
    #[serde(rename = "DevOps")]
    pub dev_ops: f64,
    #[serde(rename = "Engineering")]
    pub engineering: f64,
    #[serde(rename = "Architecture")]
    pub architecture: f64,
    #[serde(rename = "Other")]
    pub other: f64,
    #[serde(rename = "Status")]
    pub status: String,
}

/// A report column: header text and how to render the cell.
#[derive(Debug, Clone, Copy)]
pub struct WorkItemColumn {
    pub header: &'static str,
    pub cell: fn(&WorkItem) -> String,
}

/// Report columns in output order.
pub const WORK_ITEM_COLUMNS: &[WorkItemColumn] = &[
    WorkItemColumn { header: "Feature Priority", cell: feature_priority_cell },
    WorkItemColumn { header: "Feature Name", cell: feature_name_cell },
    WorkItemColumn { header: "Epic Name", cell: epic_name_cell },
    WorkItemColumn { header: "Epic Link", cell: epic_link_cell },
    WorkItemColumn { header: "Risk Finding Ids", cell: risk_cell },
    WorkItemColumn { header: "Planned", cell: planned_cell },
    WorkItemColumn { header: "DevOps", cell: dev_ops_cell },
    WorkItemColumn { header: "Engineering", cell: engineering_cell },
    WorkItemColumn { header: "Architecture", cell: architecture_cell },
    WorkItemColumn { header: "Other", cell: other_cell },
    WorkItemColumn { header: "Status", cell: status_cell },
];

fn feature_priority_cell(item: &WorkItem) -> String {
    item.feature_priority.clone()
}
fn feature_name_cell(item: &WorkItem) -> String {
    item.feature_name.clone()
}
fn epic_name_cell(item: &WorkItem) -> String {
    item.epic_name.clone()
}
fn epic_link_cell(item: &WorkItem) -> String {
    item.epic_link.clone()
}
fn risk_cell(item: &WorkItem) -> String {
    item.risk_finding_ids.join(", ")
}
fn planned_cell(item: &WorkItem) -> String {
    item.planned.to_string()
}
fn dev_ops_cell(item: &WorkItem) -> String {
    item.dev_ops.to_string()
}
fn engineering_cell(item: &WorkItem) -> String {
    item.engineering.to_string()
}
fn architecture_cell(item: &WorkItem) -> String {
    item.architecture.to_string()
}
fn other_cell(item: &WorkItem) -> String {
    item.other.to_string()
}
fn status_cell(item: &WorkItem) -> String {
    item.status.clone()
}

impl WorkItem {
    /// Cells in [`WORK_ITEM_COLUMNS`] order.
    #[must_use]
    pub fn cells(&self) -> Vec<String> {
        WORK_ITEM_COLUMNS.iter().map(|column| (column.cell)(self)).collect()
    }
}

/// Where report rows come from and how links are built.
#[derive(Debug, Clone, Copy)]
pub struct ReportSettings<'a> {
    /// Record key holding an Epic's quarter.
    pub quarter_field: &'a str,
    /// Destination tracker URL; links are `<base>/browse/<key>`.
    pub base_url: Option<&'a str>,
}

impl Default for ReportSettings<'_> {
    fn default() -> Self {
        Self {
            quarter_field: DEFAULT_QUARTER_FIELD,
            base_url: None,
        }
    }
}

/// Build the report rows for `quarter`, ordered by Epic key.
#[must_use]
pub fn build_work_items(
    records: &ClosureSet,
    quarter: &Quarter,
    settings: ReportSettings<'_>,
) -> Vec<WorkItem> {
    let features: HashMap<&str, &FlatRecord> = records
        .values()
        .filter(|record| is_type(record, "Feature"))
        .filter_map(|record| Some((record.non_blank_text(keys::ISSUE_KEY)?, record)))
        .collect();

    let items: Vec<WorkItem> = records
        .iter()
        .filter(|(_, record)| is_type(record, "Epic"))
        .filter(|(_, record)| in_quarter(record, settings.quarter_field, quarter))
        .map(|(key, epic)| work_item(key, epic, &features, settings.base_url))
        .collect();
    debug!(%quarter, features = features.len(), epics = items.len(), "Built work items");
    items
}

fn work_item(
    key: &str,
    epic: &FlatRecord,
    features: &HashMap<&str, &FlatRecord>,
    base_url: Option<&str>,
) -> WorkItem {
    let epic_key = epic.non_blank_text(keys::ISSUE_KEY).unwrap_or(key);
    let feature = epic
        .non_blank_text(keys::PARENT_LINK)
        .and_then(|parent| features.get(parent));
    let feature_text = |field: &str| {
        feature
            .and_then(|record| record.non_blank_text(field))
            .unwrap_or(NONE_PLACEHOLDER)
            .to_string()
    };

    WorkItem {
        feature_priority: feature_text(FEATURE_PRIORITY),
        feature_name: feature_text(SUMMARY),
        epic_name: epic.text(SUMMARY).unwrap_or_default().to_string(),
        epic_link: format!("{}/browse/{epic_key}", base_url.unwrap_or_default().trim_end_matches('/')),
        risk_finding_ids: epic.list(RISK_FINDING_IDS).map(<[String]>::to_vec).unwrap_or_default(),
        planned: is_planned(epic.get(PLANNED)),
        dev_ops: story_points(epic.text(STORY_POINTS)),
        engineering: 0.0,
        architecture: 0.0,
        other: 0.0,
        status: epic
            .non_blank_text(STATUS)
            .unwrap_or(DEFAULT_STATUS)
            .to_string(),
    }
}

fn is_type(record: &FlatRecord, issue_type: &str) -> bool {
    record
        .non_blank_text(keys::ISSUE_TYPE)
        .is_some_and(|value| value.eq_ignore_ascii_case(issue_type))
}

fn in_quarter(record: &FlatRecord, field: &str, quarter: &Quarter) -> bool {
    match record.get(field) {
        Some(FieldValue::Text(text)) => text.trim() == quarter.as_str(),
        Some(FieldValue::List(items)) => items.iter().any(|item| item.trim() == quarter.as_str()),
        Some(FieldValue::Flag(_)) | None => false,
    }
}

fn is_planned(value: Option<&FieldValue>) -> bool {
    match value {
        Some(FieldValue::Flag(flag)) => *flag,
        Some(FieldValue::Text(text)) => text.trim().eq_ignore_ascii_case("true"),
        Some(FieldValue::List(_)) | None => false,
    }
}

fn story_points(value: Option<&str>) -> f64 {
    value
        .and_then(|text| text.trim().parse::<f64>().ok())
        .filter(|points| points.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &str)]) -> FlatRecord {
        fields.iter().copied().collect()
    }

    fn records() -> ClosureSet {
        let mut set = ClosureSet::new();
        set.insert(
            "FEAT-1".to_string(),
            record(&[
                ("issueKey", "FEAT-1"),
                ("issueType", "Feature"),
                ("summary", "Payments"),
                ("featurePriority", "P1"),
            ]),
        );
        set.insert(
            "EPIC-1".to_string(),
            record(&[
                ("issueKey", "EPIC-1"),
                ("issueType", "Epic"),
                ("summary", "Card vault"),
                ("parentLink", "FEAT-1"),
                ("quarter", "Q12025"),
                ("plannedUnplanned", "true"),
                ("storyPoints", "8.5"),
                ("status", "In Progress"),
            ]),
        );
        set.insert(
            "EPIC-2".to_string(),
            record(&[
                ("issueKey", "EPIC-2"),
                ("issueType", "epic"),
                ("summary", "Orphan"),
                ("parentLink", "FEAT-404"),
                ("quarter", "Q12025"),
                ("storyPoints", "lots"),
                ("status", " "),
            ]),
        );
        set.insert(
            "EPIC-3".to_string(),
            record(&[("issueKey", "EPIC-3"), ("issueType", "Epic"), ("quarter", "Q22025")]),
        );
        set
    }

    #[test]
    fn quarter_format_is_enforced() {
        assert_eq!(Quarter::parse("Q12025").unwrap().as_str(), "Q12025");
        for bad in ["Q52025", "Q1-2025", "q12025", "Q1202", "Q120250", ""] {
            let err = Quarter::parse(bad).unwrap_err();
            assert!(matches!(err, BridgeError::Validation { .. }), "{bad}");
        }
    }

    #[test]
    fn epics_join_their_parent_feature() {
        let settings = ReportSettings {
            base_url: Some("https://dest.example.com/"),
            ..ReportSettings::default()
        };
        let items = build_work_items(&records(), &Quarter::parse("Q12025").unwrap(), settings);
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.epic_name, "Card vault");
        assert_eq!(first.epic_link, "https://dest.example.com/browse/EPIC-1");
        assert_eq!(first.feature_name, "Payments");
        assert_eq!(first.feature_priority, "P1");
        assert!(first.planned);
        assert!((first.dev_ops - 8.5).abs() < f64::EPSILON);
        assert_eq!(first.status, "In Progress");
    }

    #[test]
    fn missing_details_fall_back_to_defaults() {
        let items = build_work_items(
            &records(),
            &Quarter::parse("Q12025").unwrap(),
            ReportSettings::default(),
        );
        let orphan = &items[1];
        assert_eq!(orphan.epic_link, "/browse/EPIC-2");
        assert_eq!(orphan.feature_name, NONE_PLACEHOLDER);
        assert_eq!(orphan.feature_priority, NONE_PLACEHOLDER);
        assert!(!orphan.planned);
        assert!(orphan.dev_ops.abs() < f64::EPSILON);
        assert_eq!(orphan.status, DEFAULT_STATUS);
        assert!(orphan.risk_finding_ids.is_empty());
    }

    #[test]
    fn other_quarters_are_left_out() {
        let items = build_work_items(
            &records(),
            &Quarter::parse("Q22025").unwrap(),
            ReportSettings::default(),
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].epic_link, "/browse/EPIC-3");
        assert_eq!(items[0].epic_name, "");
    }

    #[test]
    fn json_fields_follow_declared_columns() {
        let items = build_work_items(
            &records(),
            &Quarter::parse("Q12025").unwrap(),
            ReportSettings::default(),
        );
        let value = serde_json::to_value(&items[0]).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), WORK_ITEM_COLUMNS.len());
        for column in WORK_ITEM_COLUMNS {
            assert!(object.contains_key(column.header), "missing {}", column.header);
        }
        assert_eq!(items[0].cells()[6], "8.5");
        assert_eq!(items[1].cells()[0], NONE_PLACEHOLDER);
    }
}

//! Flattening engine: raw issue JSON to canonical flat record.
//!
//! Each mapping entry contributes at most one key:
//! - issue-link entries always produce a (possibly empty) list of linked keys
//! - attribute entries produce a value only when the path resolves to
//!   something non-blank after coercion

use crate::mapping::{FieldMapping, IssueLinkSpec, MappingTable};
use crate::model::{FieldValue, FlatRecord};
use crate::util::{is_blank, json_path};
use serde_json::Value;

const ISSUE_LINKS_PATH: &str = "fields.issuelinks";

/// Flatten one raw issue according to the mapping table.
#[must_use]
pub fn flatten_issue(issue: &Value, table: &MappingTable) -> FlatRecord {
    let mut record = FlatRecord::new();

    for mapping in table {
        if let Some(link_spec) = &mapping.issue_link {
            record.insert(mapping.key.clone(), linked_issue_keys(issue, link_spec));
        } else if let Some(path) = &mapping.attribute_path {
            if let Some(value) = json_path::resolve(issue, path).and_then(|v| flatten_value(v, mapping)) {
                record.insert(mapping.key.clone(), value);
            }
        }
    }

    record
}

/// Coerce a resolved JSON node per the entry's data type.
///
/// Returns `None` for null, blank scalars and lists with no surviving element.
fn flatten_value(node: &Value, mapping: &FieldMapping) -> Option<FieldValue> {
    if node.is_null() {
        return None;
    }

    if mapping.data_type.is_list() {
        let items: Vec<String> = match node {
            Value::Array(elements) => elements
                .iter()
                .map(|element| mapping.data_type.coerce(&json_path::scalar_text(element)))
                .filter(|text| !is_blank(text))
                .collect(),
            other => {
                let text = mapping.data_type.coerce(&json_path::scalar_text(other));
                if is_blank(&text) { Vec::new() } else { vec![text] }
            }
        };
        return (!items.is_empty()).then_some(FieldValue::List(items));
    }

    let text = mapping.data_type.coerce(&json_path::scalar_text(node));
    (!is_blank(&text)).then_some(FieldValue::Text(text))
}

/// Collect keys of linked issues whose link type on the inspected side is allowed.
///
/// Keys keep the order in which links appear on the issue.
#[must_use]
pub fn linked_issue_keys(issue: &Value, spec: &IssueLinkSpec) -> Vec<String> {
    let (issue_side, type_side) = if spec.inward {
        ("inwardIssue", "inward")
    } else {
        ("outwardIssue", "outward")
    };

    let Some(Value::Array(links)) = json_path::resolve(issue, ISSUE_LINKS_PATH) else {
        return Vec::new();
    };

    links
        .iter()
        .filter_map(|link| {
            let label = link.get("type")?.get(type_side)?.as_str()?;
            if !spec.allowed_link_types.contains(label) {
                return None;
            }
            let key = link.get(issue_side)?.get("key")?.as_str()?;
            (!is_blank(key)).then(|| key.to_string())
        })
        .collect()
}

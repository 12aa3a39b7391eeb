//! Payload reconstruction: flat record back to a tracker write payload.

use crate::error::{BridgeError, Result};
use crate::mapping::MappingTable;
use crate::model::{FlatRecord, WriteOperation, WriteRequest, keys};
use crate::util::json_path;
use serde_json::{Map, Value, json};
use tracing::trace;

/// Payload attribute dropped on updates; the key travels as the target.
const KEY_ATTRIBUTE: &str = "key";

/// Build the write request for a flat record.
///
/// Read-only entries (linking id, parent link, issue-link lists) are never
/// written. A non-blank `issueKey` makes this an update of that issue;
/// otherwise a create in `projectKey`.
///
/// # Errors
///
/// Returns `MissingProjectKey` for a create without a non-blank `projectKey`.
pub fn build_write_request(record: &FlatRecord, table: &MappingTable) -> Result<WriteRequest> {
    let mut fields = Map::new();

    for mapping in table.iter().filter(|m| !m.is_read_only()) {
        let (Some(path), Some(value)) = (mapping.payload_path(), record.get(&mapping.key)) else {
            continue;
        };
        trace!(key = %mapping.key, path, "Placing field");
        json_path::assign(&mut fields, path, value.to_json());
    }

    let operation = if let Some(issue_key) = record.non_blank_text(keys::ISSUE_KEY) {
        fields.remove(KEY_ATTRIBUTE);
        WriteOperation::Update {
            issue_key: issue_key.to_string(),
        }
    } else {
        let project_key = record
            .non_blank_text(keys::PROJECT_KEY)
            .ok_or(BridgeError::MissingProjectKey)?;
        let issue_type = record
            .non_blank_text(keys::ISSUE_TYPE)
            .unwrap_or(keys::DEFAULT_ISSUE_TYPE);

        fields.insert("project".to_string(), json!({ "key": project_key }));
        fields.insert("issuetype".to_string(), json!({ "name": issue_type }));
        WriteOperation::Create {
            project_key: project_key.to_string(),
            issue_type: issue_type.to_string(),
        }
    };

    Ok(WriteRequest {
        operation,
        payload: json!({ "fields": Value::Object(fields) }),
    })
}

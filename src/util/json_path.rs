//! Dotted-path access into raw issue JSON.

use serde_json::{Map, Value};

/// Resolve a dotted path (`fields.status.name`) against a JSON value.
///
/// Array elements can be addressed by numeric segments (`fields.fixVersions.0.name`).
/// Returns `None` when any segment is missing.
#[must_use]
pub fn resolve<'a>(root: &'a Value, dotted_path: &str) -> Option<&'a Value> {
    dotted_path
        .split('.')
        .try_fold(root, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Write `value` at a dotted path inside `target`, creating intermediate objects.
///
/// An intermediate segment that currently holds a non-object is replaced.
pub fn assign(target: &mut Map<String, Value>, dotted_path: &str, value: Value) {
    let mut segments = dotted_path.split('.').peekable();
    let mut current = target;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }
}

/// Render a scalar JSON node as text.
///
/// Strings are returned verbatim, numbers and booleans in their JSON form.
/// Containers and null render as an empty string.
#[must_use]
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

//! Positional lookup into nested array payloads
//!
//! Payload nodes carry no keys; a value is addressed by the list of array
//! positions leading to it. A missing position is an ordinary outcome and
//! comes back as `None`, never as an error.

use serde_json::Value;

use crate::errors::{type_name, ExtractError, TransformError};

/// Resolve `path` against `tree`.
///
/// Empty nodes (`null`, `[]`, `""`, `{}`) are returned unchanged whatever the
/// remaining path is, so absence propagates instead of failing. Negative
/// indices count from the end of the array. `None` means the path does not
/// exist in this payload.
///
/// ```ignore
/// let tree = json!(["DEVELOPER", [null, null, null, null, [null, null, "URL"]], true]);
/// assert_eq!(lookup(&tree, &[1, 4, 2]), Some(&json!("URL")));
/// ```
pub fn lookup<'a>(tree: &'a Value, path: &[i64]) -> Option<&'a Value> {
    if is_empty(tree) {
        return Some(tree);
    }
    let Some((&first, rest)) = path.split_first() else {
        return Some(tree);
    };

    let items = tree.as_array()?;
    let child = items.get(resolve_index(first, items.len())?)?;

    if rest.is_empty() {
        Some(child)
    } else {
        lookup(child, rest)
    }
}

/// Strict sub-path dereference for transforms.
///
/// Unlike [`lookup`], empty nodes do not propagate: every step must index
/// into an array that has the position, and the final node must not be
/// `null`.
pub fn require<'a>(tree: &'a Value, path: &[i64]) -> Result<&'a Value, TransformError> {
    let mut current = tree;
    for &index in path {
        let items = current
            .as_array()
            .ok_or_else(|| TransformError::unexpected("array", current))?;
        current = resolve_index(index, items.len())
            .map(|pos| &items[pos])
            .ok_or_else(|| TransformError::Missing(format!("index {index} of {path:?}")))?;
    }
    if current.is_null() {
        return Err(TransformError::Missing(format!("null at {path:?}")));
    }
    Ok(current)
}

pub fn lookup_str<'a>(tree: &'a Value, path: &[i64]) -> Option<&'a str> {
    lookup(tree, path).and_then(Value::as_str)
}

/// Describe why `path` cannot be followed in `tree`, for diagnostics.
pub(crate) fn explain_miss(tree: &Value, path: &[i64]) -> ExtractError {
    let mut current = tree;
    for (depth, &index) in path.iter().enumerate() {
        match current {
            Value::Array(items) => match resolve_index(index, items.len()) {
                Some(pos) => current = &items[pos],
                None => {
                    return ExtractError::ShapeMismatch(format!(
                        "index {index} out of range at depth {depth} (len {})",
                        items.len()
                    ))
                }
            },
            other if is_empty(other) => return ExtractError::Absent,
            other => {
                return ExtractError::ShapeMismatch(format!(
                    "cannot index into {} at depth {depth}",
                    type_name(other)
                ))
            }
        }
    }
    ExtractError::Absent
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let pos = if index < 0 { len + index } else { index };
    if (0..len).contains(&pos) {
        usize::try_from(pos).ok()
    } else {
        None
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

//! Helpers for building sparse positional payloads in tests

use serde_json::Value;

/// Write `leaf` at `path`, growing arrays with `null` padding as needed.
pub(crate) fn set_path(tree: &mut Value, path: &[usize], leaf: Value) {
    let Some((&first, rest)) = path.split_first() else {
        *tree = leaf;
        return;
    };
    if !tree.is_array() {
        *tree = Value::Array(Vec::new());
    }
    if let Value::Array(items) = tree {
        if items.len() <= first {
            items.resize(first + 1, Value::Null);
        }
        set_path(&mut items[first], rest, leaf);
    }
}

/// A fresh tree holding only `leaf` at `path`.
pub(crate) fn nest(path: &[usize], leaf: Value) -> Value {
    let mut tree = Value::Null;
    set_path(&mut tree, path, leaf);
    tree
}

//! Category discovery
//!
//! Categories sit at no fixed depth: an app node may hold a single record, a
//! list of records, or groups of records nested arbitrarily deep. The only
//! distinguishing signal is the record shape itself, an array of at least
//! four elements whose head is the category name.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::TransformError;
use crate::lookup::{lookup, lookup_str};

/// Where the category groups live inside an app node
pub const CATEGORIES_PATH: [i64; 1] = [118];
/// Primary genre name, used when no category is tagged
pub const GENRE_NAME_PATH: [i64; 4] = [79, 0, 0, 0];
/// Primary genre id
pub const GENRE_ID_PATH: [i64; 4] = [79, 0, 0, 2];

const MIN_RECORD_LEN: usize = 4;

/// A single category tag on an app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub name: String,
    /// String in current payloads, numeric in some older ones
    pub id: Value,
}

impl CategoryRecord {
    pub fn new(name: impl Into<String>, id: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Collect every category record under `node`, in encounter order.
///
/// Duplicates are kept. Each call starts from an empty accumulator.
pub fn classify(node: &Value) -> Vec<CategoryRecord> {
    let mut found = Vec::new();
    collect_records(node, &mut found);
    found
}

fn collect_records(node: &Value, found: &mut Vec<CategoryRecord>) {
    let Value::Array(items) = node else {
        return;
    };

    if items.len() >= MIN_RECORD_LEN {
        if let Some(name) = items[0].as_str() {
            found.push(CategoryRecord::new(name, items[2].clone()));
            return;
        }
    }

    for item in items {
        collect_records(item, found);
    }
}

/// Categories of an app node, falling back to its primary genre.
///
/// Untagged apps are listed under their genre by the store itself, so an
/// empty classification becomes a single record built from the genre paths.
/// Without a genre name there is nothing to synthesize from, and the error
/// lets the owning rule fall back (the detail catalog uses `[]`).
pub fn categories_or_genre(app: &Value) -> Result<Vec<CategoryRecord>, TransformError> {
    let categories = lookup(app, &CATEGORIES_PATH)
        .map(classify)
        .unwrap_or_default();
    if !categories.is_empty() {
        return Ok(categories);
    }

    let name = lookup_str(app, &GENRE_NAME_PATH)
        .ok_or_else(|| TransformError::Missing("primary genre name".to_string()))?;
    let id = lookup(app, &GENRE_ID_PATH).cloned().unwrap_or(Value::Null);
    tracing::trace!(genre = name, "no category records, using primary genre");

    Ok(vec![CategoryRecord::new(name, id)])
}

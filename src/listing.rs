//! App lists and permission groups
//!
//! Search, collection, developer and "similar" pages all render the same
//! cluster: a list of app nodes plus a continuation token for the next page.

use std::sync::LazyLock;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::errors::TransformError;
use crate::lookup::{lookup, lookup_str};
use crate::registry::{ExtractionResult, FieldRegistry};
use crate::rule::FieldRule;
use crate::transform::Transform;

/// Where the app id sits inside an app node
pub const APP_ID_PATH: [i64; 2] = [12, 0];

/// Permissions without a named group
pub const OTHER_PERMISSIONS: &str = "Other";

static CLUSTER: LazyLock<FieldRegistry> = LazyLock::new(FieldRegistry::cluster);
static APP_SUMMARY: LazyLock<FieldRegistry> = LazyLock::new(app_summary);

/// One page of a cluster listing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterPage {
    pub apps: Vec<Value>,
    /// Continuation token for the next page, if any
    pub token: Option<String>,
    /// Store-relative link to the full cluster
    pub cluster_url: Option<String>,
}

impl ClusterPage {
    pub fn has_more(&self) -> bool {
        self.token.is_some()
    }

    pub fn app_ids(&self, limit: Option<usize>) -> Vec<String> {
        parse_app_ids(&self.apps, limit)
    }

    pub fn app_summaries(&self, limit: Option<usize>) -> Vec<ExtractionResult> {
        parse_app_summaries(&self.apps, limit)
    }
}

/// Per-app-node catalog used for list entries
///
/// The rules carry no partition: they address one app node directly.
pub fn app_summary() -> FieldRegistry {
    let price_path: [i64; 7] = [7, 0, 3, 2, 1, 0, 2];
    let mut r = FieldRegistry::new();
    r.insert(
        "url",
        FieldRule::new(&[9, 4, 2]).with_transform(Transform::AbsoluteUrl),
    )
    .insert("appId", FieldRule::new(&APP_ID_PATH))
    .insert("title", FieldRule::new(&[2]))
    .insert("summary", FieldRule::new(&[4, 1, 1, 1, 1]))
    .insert("developer", FieldRule::new(&[4, 0, 0, 0]))
    .insert(
        "developerId",
        FieldRule::new(&[4, 0, 0, 1, 4, 2]).with_transform(Transform::QueryId),
    )
    .insert("icon", FieldRule::new(&[1, 1, 0, 3, 2]))
    .insert("score", FieldRule::new(&[6, 0, 2, 1, 1]))
    .insert("scoreText", FieldRule::new(&[6, 0, 2, 1, 0]))
    .insert(
        "priceText",
        FieldRule::new(&price_path)
            .with_transform(Transform::custom(price_text))
            .or_value("Free"),
    )
    .insert(
        "free",
        FieldRule::new(&price_path)
            .with_transform(Transform::custom(is_free))
            .or_value(true),
    );
    r
}

// An empty offer list stands for a free app.
fn price_text(value: &Value) -> Result<Value, TransformError> {
    match value {
        Value::Array(items) if items.is_empty() => Ok(Value::from("Free")),
        Value::String(_) => Ok(value.clone()),
        other => Err(TransformError::unexpected("string", other)),
    }
}

fn is_free(value: &Value) -> Result<Value, TransformError> {
    Ok(Value::Bool(matches!(value, Value::Array(items) if items.is_empty())))
}

/// First cluster of a listing page payload
pub fn parse_cluster(payload: &Value) -> ClusterPage {
    let result = CLUSTER.extract_all(payload);
    page_from(
        result.get("apps"),
        result.get("token"),
        result.get("cluster"),
    )
}

/// Follow-up page decoded from a continuation RPC response
pub fn parse_continuation(response: &Value) -> ClusterPage {
    page_from(
        lookup(response, &[0, 0, 0]),
        lookup(response, &[0, 0, 7, 1]),
        None,
    )
}

fn page_from(apps: Option<&Value>, token: Option<&Value>, cluster: Option<&Value>) -> ClusterPage {
    ClusterPage {
        apps: apps
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        token: owned_str(token),
        cluster_url: owned_str(cluster),
    }
}

fn owned_str(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

/// App ids of the first `limit` app nodes; nodes without an id are skipped.
pub fn parse_app_ids(apps: &[Value], limit: Option<usize>) -> Vec<String> {
    apps.iter()
        .take(limit.unwrap_or(usize::MAX))
        .filter_map(|app| lookup_str(app, &APP_ID_PATH))
        .map(str::to_string)
        .collect()
}

pub fn parse_app_summaries(apps: &[Value], limit: Option<usize>) -> Vec<ExtractionResult> {
    apps.iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|app| APP_SUMMARY.extract_all(app))
        .collect()
}

/// Group a permission RPC payload by permission group name.
///
/// Two-element entries are ungrouped and land under [`OTHER_PERMISSIONS`];
/// longer entries carry their group name at `[0]` and members at `[2]`.
pub fn parse_permissions(payload: &Value) -> IndexMap<String, Vec<Value>> {
    let mut groups: IndexMap<String, Vec<Value>> = IndexMap::new();
    let sections = payload.as_array().map(Vec::as_slice).unwrap_or_default();

    for section in sections {
        let Some(entries) = section.as_array() else {
            continue;
        };
        for entry in entries {
            let Some(fields) = entry.as_array() else {
                continue;
            };
            if fields.len() == 2 {
                groups
                    .entry(OTHER_PERMISSIONS.to_string())
                    .or_default()
                    .push(fields[1].clone());
                continue;
            }

            let Some(group) = fields.first().and_then(Value::as_str) else {
                tracing::trace!("permission entry without group name");
                continue;
            };
            let members = fields.get(2).and_then(Value::as_array);
            for member in members.into_iter().flatten() {
                if let Some(name) = lookup(member, &[1]) {
                    groups.entry(group.to_string()).or_default().push(name.clone());
                }
            }
        }
    }

    groups
}

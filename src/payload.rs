//! Payload decoding
//!
//! Store pages embed their data as a series of
//! `AF_initDataCallback({key: 'ds:N', hash: '..', data: [...], sideChannel: {}});`
//! script blocks. Each block becomes one `ds:N` partition of the payload.
//! Follow-up RPC responses (`batchexecute`) wrap a JSON string inside an
//! anti-hijacking prefixed envelope.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value};

use crate::errors::PayloadError;
use crate::lookup::lookup;

const CALLBACK_MARKER: &str = "AF_initDataCallback";
const ENVELOPE_GUARD: &str = ")]}'";
const DATA_ERROR_MARKER: &str = "PlayDataError";

static CALLBACK_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"key:\s*'(ds:\d+)'").unwrap());
static CALLBACK_DATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"data:([\s\S]*?), sideChannel: \{\}\}\);").unwrap());

/// Decode every `ds:N` data block of a store page into a partitioned payload.
///
/// Blocks whose data is not valid JSON are skipped; a page without any
/// decodable block is an error.
pub fn parse_page(html: &str) -> Result<Value, PayloadError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script").unwrap();
    let mut partitions = Map::new();

    for element in document.select(&selector) {
        let script = element.text().collect::<String>();
        if !script.contains(CALLBACK_MARKER) {
            continue;
        }
        if let Some((key, data)) = parse_callback(&script) {
            partitions.insert(key, data);
        }
    }

    if partitions.is_empty() {
        return Err(PayloadError::NoDataCallbacks);
    }
    tracing::debug!(partitions = partitions.len(), "decoded page payload");
    Ok(Value::Object(partitions))
}

fn parse_callback(script: &str) -> Option<(String, Value)> {
    let key = CALLBACK_KEY.captures(script)?.get(1)?.as_str().to_string();
    let raw = CALLBACK_DATA.captures(script)?.get(1)?.as_str();

    match serde_json::from_str(raw) {
        Ok(data) => Some((key, data)),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "skipping undecodable data block");
            None
        }
    }
}

/// Ordinal of a `ds:N` partition key
pub fn partition_ordinal(key: &str) -> Option<u32> {
    key.strip_prefix("ds:")?.parse().ok()
}

/// The highest-numbered partition, which carries site metadata
pub fn site_partition(payload: &Value) -> Option<&Value> {
    payload
        .as_object()?
        .iter()
        .filter_map(|(key, value)| partition_ordinal(key).map(|n| (n, value)))
        .max_by_key(|(n, _)| *n)
        .map(|(_, value)| value)
}

/// Country the store served the page for
pub fn site_location(payload: &Value) -> Option<&Value> {
    site_partition(payload).and_then(|site| lookup(site, &[4]))
}

/// Language the store served the page in
pub fn site_language(payload: &Value) -> Option<&Value> {
    site_partition(payload).and_then(|site| lookup(site, &[5]))
}

/// Whether an RPC response body reports a transient data error
pub fn is_data_error(body: &str) -> bool {
    body.contains(DATA_ERROR_MARKER)
}

/// Decode a `batchexecute` response into the inner payload tree.
///
/// The body starts with the `)]}'` guard line; the outer JSON carries the
/// real payload as a JSON string at `[0, 2]`.
pub fn parse_batch_response(body: &str) -> Result<Value, PayloadError> {
    let json = body
        .trim_start()
        .strip_prefix(ENVELOPE_GUARD)
        .ok_or_else(|| PayloadError::MalformedEnvelope("missing guard prefix".to_string()))?;
    let outer: Value = serde_json::from_str(json.trim_start())?;

    let inner = lookup(&outer, &[0, 2])
        .and_then(Value::as_str)
        .ok_or_else(|| PayloadError::MalformedEnvelope("no payload string at [0, 2]".to_string()))?;
    Ok(serde_json::from_str(inner)?)
}

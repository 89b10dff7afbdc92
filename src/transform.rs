//! Value transforms applied after a successful lookup
//!
//! Each transform is a pure `&Value -> Result<Value, TransformError>`
//! function. Failures are reported, never panicked on; the owning rule turns
//! them into its fallback.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use serde_json::{Number, Value};
use url::Url;

use crate::categories::categories_or_genre;
use crate::errors::TransformError;
use crate::lookup::{lookup, require};

/// Origin that store-relative links are resolved against
pub const STORE_ORIGIN: &str = "https://play.google.com";

const MICROS_PER_UNIT: f64 = 1_000_000.0;

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static NOT_DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\d]").unwrap());

/// Signature of a caller-supplied transform
pub type TransformFn = fn(&Value) -> Result<Value, TransformError>;

/// Wrapper so caller-supplied functions can sit inside [`Transform`]
#[derive(Clone, Copy)]
pub struct CustomTransform(pub TransformFn);

impl fmt::Debug for CustomTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomTransform(..)")
    }
}

/// Normalising step of a field rule
///
/// Deserialises from the snake_case variant name, e.g. `"micros"` or
/// `{"pluck": [3, 2]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Decode HTML entities and turn `<br>` into CRLF
    UnescapeText,
    /// Keep only the digits of a count like `"1,000,000+"`; empty text is 0
    Digits,
    /// Convert a micro-unit amount into units; zero stays integer 0
    Micros,
    /// Whether a numeric amount equals zero
    IsZero,
    /// Truthiness: null, false, 0 and empty containers are false
    Truthy,
    /// First whitespace-separated word, e.g. `"4.1 and up"` -> `"4.1"`
    FirstWord,
    /// Decoded `id` query parameter of a store link
    QueryId,
    /// Star counts from a rating histogram node, one through five
    Histogram,
    /// Map every element of an array through a sub-path
    Pluck(Vec<i64>),
    /// First non-empty value among several sub-paths
    FirstOf(Vec<Vec<i64>>),
    /// Category records of an app node, or its primary genre
    Categories,
    /// Resolve a store-relative link against [`STORE_ORIGIN`]
    AbsoluteUrl,
    /// Apply several transforms in order
    Chain(Vec<Transform>),
    #[serde(skip)]
    Custom(CustomTransform),
}

impl Transform {
    pub fn custom(func: TransformFn) -> Self {
        Transform::Custom(CustomTransform(func))
    }

    pub fn apply(&self, value: &Value) -> Result<Value, TransformError> {
        match self {
            Transform::UnescapeText => unescape_text(expect_str(value)?).map(Value::String),
            Transform::Digits => digits(value),
            Transform::Micros => micros(value),
            Transform::IsZero => Ok(Value::Bool(value.as_f64() == Some(0.0))),
            Transform::Truthy => Ok(Value::Bool(truthy(value))),
            Transform::FirstWord => expect_str(value)?
                .split_whitespace()
                .next()
                .map(|word| Value::String(word.to_string()))
                .ok_or_else(|| TransformError::Missing("first word".to_string())),
            Transform::QueryId => query_id(expect_str(value)?).map(Value::String),
            Transform::Histogram => histogram(value),
            Transform::Pluck(path) => pluck(value, path),
            Transform::FirstOf(paths) => paths
                .iter()
                .filter_map(|path| lookup(value, path))
                .find(|found| truthy(found))
                .cloned()
                .ok_or_else(|| TransformError::Missing(format!("none of {paths:?}"))),
            Transform::Categories => {
                let records = categories_or_genre(value)?;
                serde_json::to_value(records).map_err(|e| TransformError::Parse(e.to_string()))
            }
            Transform::AbsoluteUrl => absolute_url(expect_str(value)?).map(Value::String),
            Transform::Chain(steps) => steps
                .iter()
                .try_fold(value.clone(), |current, step| step.apply(&current)),
            Transform::Custom(CustomTransform(func)) => func(value),
        }
    }
}

fn expect_str(value: &Value) -> Result<&str, TransformError> {
    value
        .as_str()
        .ok_or_else(|| TransformError::unexpected("string", value))
}

/// Decode the entities of a store text block and turn `<br>` into CRLF.
///
/// Other markup is kept as literal text.
pub fn unescape_text(text: &str) -> Result<String, TransformError> {
    let lines: Vec<String> = LINE_BREAK
        .split(text)
        .map(|line| {
            Html::parse_fragment(&line.replace('<', "&lt;"))
                .root_element()
                .text()
                .collect::<String>()
        })
        .collect();
    Ok(lines.join("\r\n"))
}

fn digits(value: &Value) -> Result<Value, TransformError> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::String(s) if s.is_empty() => Ok(Value::from(0)),
        Value::String(s) => NOT_DIGIT
            .replace_all(s, "")
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| TransformError::Parse(s.clone())),
        other => Err(TransformError::unexpected("string", other)),
    }
}

fn micros(value: &Value) -> Result<Value, TransformError> {
    let amount = value
        .as_f64()
        .ok_or_else(|| TransformError::unexpected("number", value))?;
    let units = amount / MICROS_PER_UNIT;
    if units == 0.0 {
        return Ok(Value::from(0));
    }
    Number::from_f64(units)
        .map(Value::Number)
        .ok_or_else(|| TransformError::Parse(amount.to_string()))
}

/// Python-style truthiness of a payload value
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn query_id(link: &str) -> Result<String, TransformError> {
    let url = absolute(link)?;
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, id)| id.into_owned())
        .ok_or_else(|| TransformError::Missing(format!("id parameter in '{link}'")))
}

fn histogram(container: &Value) -> Result<Value, TransformError> {
    (1..=5)
        .map(|stars| require(container, &[stars, 1]).cloned())
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn pluck(container: &Value, path: &[i64]) -> Result<Value, TransformError> {
    let items = container
        .as_array()
        .ok_or_else(|| TransformError::unexpected("array", container))?;
    items
        .iter()
        .map(|item| require(item, path).cloned())
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn absolute(link: &str) -> Result<Url, TransformError> {
    Url::parse(STORE_ORIGIN)
        .and_then(|base| base.join(link))
        .map_err(|_| TransformError::Parse(link.to_string()))
}

fn absolute_url(link: &str) -> Result<String, TransformError> {
    absolute(link).map(String::from)
}

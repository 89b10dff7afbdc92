//! Error types
//!
//! `ExtractError` and `TransformError` never leave a single field evaluation:
//! `FieldRule::evaluate` turns them into the rule's fallback. `PayloadError`
//! and `RegistryError` describe a whole input document and are returned to
//! the caller.

use thiserror::Error;

/// Why a single field could not be extracted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    #[error("partition '{0}' is missing from the payload")]
    PartitionMissing(String),
    #[error("path is absent from the payload")]
    Absent,
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Failure inside a transform function
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("missing value: {0}")]
    Missing(String),
    #[error("cannot parse '{0}'")]
    Parse(String),
}

impl TransformError {
    pub(crate) fn unexpected(expected: &'static str, found: &serde_json::Value) -> Self {
        TransformError::UnexpectedType {
            expected,
            found: type_name(found),
        }
    }
}

/// Page or RPC envelope could not be decoded into a payload
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("no data callbacks found in page")]
    NoDataCallbacks,
    #[error("invalid JSON in payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed response envelope: {0}")]
    MalformedEnvelope(String),
}

/// Field catalog configuration could not be loaded
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid field catalog: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("field '{0}' has an empty index path")]
    EmptyPath(String),
}

pub(crate) fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

//! Declarative field rules
//!
//! A [`FieldRule`] says where one logical field lives (optional partition
//! plus index path), how to normalise it, and what to produce when it cannot
//! be read. Rules hold no state and can be shared across threads and
//! payloads.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::ExtractError;
use crate::lookup::{explain_miss, lookup};
use crate::transform::Transform;

/// Longest fallback chain followed before giving up with `null`
pub const MAX_FALLBACK_DEPTH: usize = 16;

/// Payload key of the partition with the given ordinal
pub fn partition_key(ordinal: u32) -> String {
    format!("ds:{ordinal}")
}

/// What a rule yields when its own lookup or transform fails
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    #[default]
    Null,
    Value(Value),
    Rule(Box<FieldRule>),
}

/// How to extract one field from a payload
#[derive(Debug, Clone, Deserialize)]
pub struct FieldRule {
    /// `ds:<n>` partition to search; `None` searches the payload itself
    #[serde(default)]
    pub partition: Option<u32>,
    pub path: Vec<i64>,
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub fallback: Fallback,
}

impl FieldRule {
    /// Rule addressing the payload directly
    pub fn new(path: &[i64]) -> Self {
        Self {
            partition: None,
            path: path.to_vec(),
            transform: None,
            fallback: Fallback::Null,
        }
    }

    /// Rule addressing partition `ds:<ordinal>`
    pub fn ds(ordinal: u32, path: &[i64]) -> Self {
        Self {
            partition: Some(ordinal),
            ..Self::new(path)
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn or_value(mut self, value: impl Into<Value>) -> Self {
        self.fallback = Fallback::Value(value.into());
        self
    }

    pub fn or_rule(mut self, rule: FieldRule) -> Self {
        self.fallback = Fallback::Rule(Box::new(rule));
        self
    }

    /// Extract the field, resolving the fallback on any failure.
    ///
    /// Never fails: a broken or missing field degrades to the fallback
    /// literal, the fallback rule's result, or `null`.
    pub fn evaluate(&self, payload: &Value) -> Value {
        self.evaluate_chain(payload, 0)
    }

    fn evaluate_chain(&self, payload: &Value, depth: usize) -> Value {
        let err = match self.try_extract(payload) {
            Ok(value) => return value,
            Err(err) => err,
        };
        tracing::debug!(
            partition = ?self.partition,
            path = ?self.path,
            error = %err,
            "field not extracted, resolving fallback"
        );

        match &self.fallback {
            Fallback::Null => Value::Null,
            Fallback::Value(value) => value.clone(),
            Fallback::Rule(next) if depth < MAX_FALLBACK_DEPTH => {
                next.evaluate_chain(payload, depth + 1)
            }
            Fallback::Rule(_) => {
                tracing::warn!(path = ?self.path, "fallback chain too deep, giving up");
                Value::Null
            }
        }
    }

    /// Lookup and transform without the fallback.
    ///
    /// A located `null` counts as absent, so the transform only ever sees
    /// real values.
    pub fn try_extract(&self, payload: &Value) -> Result<Value, ExtractError> {
        let tree = self.select_partition(payload)?;
        let raw = match lookup(tree, &self.path) {
            Some(Value::Null) => return Err(ExtractError::Absent),
            Some(raw) => raw,
            None => return Err(explain_miss(tree, &self.path)),
        };

        match &self.transform {
            Some(transform) => Ok(transform.apply(raw)?),
            None => Ok(raw.clone()),
        }
    }

    fn select_partition<'a>(&self, payload: &'a Value) -> Result<&'a Value, ExtractError> {
        let Some(ordinal) = self.partition else {
            return Ok(payload);
        };
        let key = partition_key(ordinal);
        match payload.get(&key) {
            Some(tree) => Ok(tree),
            None => Err(ExtractError::PartitionMissing(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::nest;
    use crate::transform::Transform;
    use serde_json::json;

    #[test]
    fn test_evaluate_installs_without_transform() {
        let payload = json!({"ds:5": nest(&[1, 2, 13, 0], json!("1,000,000+"))});
        let rule = FieldRule::ds(5, &[1, 2, 13, 0]);

        assert_eq!(rule.evaluate(&payload), json!("1,000,000+"));
    }

    #[test]
    fn test_evaluate_price_transform_and_fallback() {
        let rule = FieldRule::ds(5, &[0, 1])
            .with_transform(Transform::Micros)
            .or_value(0);

        let priced = json!({"ds:5": [[null, 1_990_000]]});
        assert_eq!(rule.evaluate(&priced), json!(1.99));

        let missing = json!({"ds:5": [[null]]});
        assert_eq!(rule.evaluate(&missing), json!(0));
    }

    #[test]
    fn test_transform_failure_uses_fallback() {
        let rule = FieldRule::ds(1, &[0])
            .with_transform(Transform::Micros)
            .or_value("n/a");
        let payload = json!({"ds:1": ["not a number"]});

        assert_eq!(rule.evaluate(&payload), json!("n/a"));
        assert!(matches!(
            rule.try_extract(&payload),
            Err(ExtractError::Transform(_))
        ));
    }

    #[test]
    fn test_missing_partition() {
        let rule = FieldRule::ds(9, &[0]).or_value(false);
        let payload = json!({"ds:1": [1]});

        assert_eq!(rule.evaluate(&payload), json!(false));
        assert_eq!(
            rule.try_extract(&payload),
            Err(ExtractError::PartitionMissing("ds:9".to_string()))
        );
    }

    #[test]
    fn test_unpartitioned_rule_reads_payload_directly() {
        let rule = FieldRule::new(&[1, 0]);

        assert_eq!(rule.evaluate(&json!([0, ["app.id"]])), json!("app.id"));
        assert_eq!(rule.evaluate(&json!({"ds:1": [0, ["app.id"]]})), Value::Null);
    }

    #[test]
    fn test_null_value_is_absent() {
        let rule = FieldRule::ds(5, &[0]).or_value("Varies with device");

        assert_eq!(rule.evaluate(&json!({"ds:5": [null]})), json!("Varies with device"));
    }

    #[test]
    fn test_fallback_chain_resolves_in_order() {
        let last = FieldRule::ds(3, &[7]).or_value("X");
        let middle = FieldRule::ds(2, &[7]).or_rule(last);
        let first = FieldRule::ds(1, &[7]).or_rule(middle);
        let payload = json!({"ds:1": [0], "ds:2": [1]});

        assert_eq!(first.evaluate(&payload), json!("X"));

        let found_late = json!({"ds:3": [0, 0, 0, 0, 0, 0, 0, "third"]});
        assert_eq!(first.evaluate(&found_late), json!("third"));
    }

    #[test]
    fn test_fallback_rule_sees_original_payload() {
        let genre = FieldRule::ds(5, &[1, 0]);
        let rule = FieldRule::ds(5, &[0, 0]).or_rule(genre);
        let payload = json!({"ds:5": [[null], ["Tools"]]});

        assert_eq!(rule.evaluate(&payload), json!("Tools"));
    }

    #[test]
    fn test_overlong_fallback_chain_yields_null() {
        let mut rule = FieldRule::new(&[0]).or_value("end");
        for _ in 0..(MAX_FALLBACK_DEPTH + 2) {
            rule = FieldRule::new(&[0]).or_rule(rule);
        }

        assert_eq!(rule.evaluate(&json!([])), json!([]));
        assert_eq!(rule.evaluate(&json!([null])), Value::Null);
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let rule = FieldRule::ds(5, &[0]).with_transform(Transform::Digits);
        let payload = json!({"ds:5": ["10,000+"]});

        assert_eq!(rule.evaluate(&payload), rule.evaluate(&payload));
        assert_eq!(rule.evaluate(&payload), json!(10_000));
    }

    #[test]
    fn test_deserialize_rule() {
        let rule: FieldRule = serde_json::from_str(
            r#"{
                "partition": 5,
                "path": [1, 2, 57, 0],
                "transform": "micros",
                "fallback": {"rule": {"partition": 3, "path": [0], "fallback": {"value": 0}}}
            }"#,
        )
        .unwrap();

        assert_eq!(rule.partition, Some(5));
        assert!(matches!(rule.transform, Some(Transform::Micros)));
        assert!(matches!(rule.fallback, Fallback::Rule(ref next) if next.partition == Some(3)));
        assert_eq!(rule.evaluate(&json!({})), json!(0));
    }
}

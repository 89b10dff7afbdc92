//! Field catalogs
//!
//! A [`FieldRegistry`] maps output field names to [`FieldRule`]s. Rules are
//! independent of each other, so the order of evaluation only decides the
//! order of keys in the [`ExtractionResult`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::RegistryError;
use crate::rule::{Fallback, FieldRule};
use crate::transform::Transform;

/// Fallback for fields the store leaves blank on multi-APK listings
pub const VARIES_WITH_DEVICE: &str = "Varies with device";

/// Field name -> extracted value, in catalog order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExtractionResult {
    pub values: IndexMap<String, Value>,
}

impl ExtractionResult {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.values.insert(field.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flat JSON object of all fields
    pub fn into_json(self) -> Value {
        Value::Object(self.values.into_iter().collect())
    }
}

/// Named field rules, evaluated together against one payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FieldRegistry {
    rules: IndexMap<String, FieldRule>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON object of `name -> rule`.
    ///
    /// ```ignore
    /// let registry = FieldRegistry::from_json(r#"{
    ///     "title": {"partition": 5, "path": [1, 2, 0, 0]},
    ///     "price": {"partition": 5, "path": [1, 2, 57, 0], "transform": "micros",
    ///               "fallback": {"value": 0}}
    /// }"#)?;
    /// ```
    pub fn from_json(source: &str) -> Result<Self, RegistryError> {
        let registry: FieldRegistry = serde_json::from_str(source)?;
        for (name, rule) in &registry.rules {
            validate_chain(name, rule)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, name: impl Into<String>, rule: FieldRule) -> &mut Self {
        self.rules.insert(name.into(), rule);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldRule> {
        self.rules.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate a single named field; `None` if the name is not in the catalog.
    pub fn extract(&self, name: &str, payload: &Value) -> Option<Value> {
        self.rules.get(name).map(|rule| rule.evaluate(payload))
    }

    /// Evaluate every rule against `payload`.
    pub fn extract_all(&self, payload: &Value) -> ExtractionResult {
        let values = self
            .rules
            .iter()
            .map(|(name, rule)| (name.clone(), rule.evaluate(payload)))
            .collect();
        ExtractionResult { values }
    }

    /// App detail page catalog
    pub fn details() -> Self {
        let mut r = Self::new();
        fn app(path: &[i64]) -> FieldRule {
            FieldRule::ds(5, &[&[1, 2][..], path].concat())
        }
        let price_path: [i64; 8] = [57, 0, 0, 0, 0, 1, 0, 0];
        let sale_path: [i64; 8] = [0, 2, 0, 0, 0, 14, 0, 0];

        r.insert("title", app(&[0, 0]))
            .insert(
                "description",
                app(&[12, 0, 0, 1])
                    .with_transform(Transform::UnescapeText)
                    .or_rule(app(&[72, 0, 1]).with_transform(Transform::UnescapeText)),
            )
            .insert(
                "descriptionHTML",
                app(&[]).with_transform(Transform::FirstOf(vec![
                    vec![12, 0, 0, 1],
                    vec![72, 0, 1],
                ])),
            )
            .insert("summary", app(&[73, 0, 1]).with_transform(Transform::UnescapeText))
            .insert("installs", app(&[13, 0]))
            .insert("minInstalls", app(&[13, 1]))
            .insert("realInstalls", app(&[13, 2]))
            .insert("score", app(&[51, 0, 1]))
            .insert("ratings", app(&[51, 2, 1]))
            .insert("reviews", app(&[51, 3, 1]))
            .insert(
                "histogram",
                app(&[51, 1])
                    .with_transform(Transform::Histogram)
                    .or_value(vec![0; 5]),
            )
            .insert(
                "price",
                app(&price_path).with_transform(Transform::Micros).or_value(0),
            )
            .insert("free", app(&price_path).with_transform(Transform::IsZero))
            .insert("currency", app(&[57, 0, 0, 0, 0, 1, 0, 1]))
            .insert(
                "sale",
                FieldRule::ds(4, &sale_path)
                    .with_transform(Transform::Truthy)
                    .or_value(false),
            )
            .insert("saleTime", FieldRule::ds(4, &sale_path))
            .insert(
                "originalPrice",
                FieldRule::ds(3, &[0, 2, 0, 0, 0, 1, 1, 0]).with_transform(Transform::Micros),
            )
            .insert("saleText", FieldRule::ds(4, &[0, 2, 0, 0, 0, 14, 1]))
            .insert(
                "offersIAP",
                app(&[19, 0]).with_transform(Transform::Truthy).or_value(false),
            )
            .insert("inAppProductPrice", app(&[19, 0]))
            .insert("developer", app(&[68, 0]))
            .insert("developerId", app(&[68, 1, 4, 2]).with_transform(Transform::QueryId))
            .insert("developerEmail", app(&[69, 1, 0]))
            .insert("developerWebsite", app(&[69, 0, 5, 2]))
            .insert("developerAddress", app(&[69, 2, 0]))
            .insert("privacyPolicy", app(&[99, 0, 5, 2]))
            .insert("genre", app(&[79, 0, 0, 0]))
            .insert("genreId", app(&[79, 0, 0, 2]))
            .insert(
                "categories",
                app(&[]).with_transform(Transform::Categories).or_value(Vec::<Value>::new()),
            )
            .insert("icon", app(&[95, 0, 3, 2]))
            .insert("headerImage", app(&[96, 0, 3, 2]))
            .insert(
                "screenshots",
                app(&[78, 0])
                    .with_transform(Transform::Pluck(vec![3, 2]))
                    .or_value(Vec::<Value>::new()),
            )
            .insert("video", app(&[100, 0, 0, 3, 2]))
            .insert("videoImage", app(&[100, 1, 0, 3, 2]))
            .insert("contentRating", app(&[9, 0]))
            .insert("contentRatingDescription", app(&[9, 2, 1]))
            .insert("adSupported", app(&[48]).with_transform(Transform::Truthy))
            .insert(
                "containsAds",
                app(&[48]).with_transform(Transform::Truthy).or_value(false),
            )
            .insert("released", app(&[10, 0]))
            .insert("updated", app(&[145, 0, 1, 0]))
            .insert("version", app(&[140, 0, 0, 0]).or_value(VARIES_WITH_DEVICE))
            .insert(
                "androidVersion",
                app(&[140, 1, 1, 0, 0, 1])
                    .with_transform(Transform::FirstWord)
                    .or_value(VARIES_WITH_DEVICE),
            )
            .insert(
                "androidVersionText",
                app(&[140, 1, 1, 0, 0, 1]).or_value(VARIES_WITH_DEVICE),
            )
            .insert(
                "recentChanges",
                app(&[144, 1, 1]).with_transform(Transform::UnescapeText),
            )
            .insert("recentChangesHTML", app(&[144, 1, 1]))
            .insert(
                "comments",
                FieldRule::ds(8, &[0])
                    .with_transform(Transform::Pluck(vec![4]))
                    .or_value(Vec::<Value>::new()),
            )
            .insert(
                "similarURL",
                FieldRule::ds(7, &[1, 1, 0, 0, 3, 4, 2]).with_transform(Transform::AbsoluteUrl),
            );
        r
    }

    /// Cluster page catalog: app list, continuation token, "see more" link
    pub fn cluster() -> Self {
        let mut r = Self::new();
        r.insert("cluster", FieldRule::ds(3, &[0, 1, 0, 0, 3, 4, 2]))
            .insert(
                "apps",
                FieldRule::ds(3, &[0, 1, 0, 0, 0]).or_value(Vec::<Value>::new()),
            )
            .insert("token", FieldRule::ds(3, &[0, 1, 0, 0, 7, 1]));
        r
    }
}

fn validate_chain(name: &str, rule: &FieldRule) -> Result<(), RegistryError> {
    let mut current = Some(rule);
    while let Some(rule) = current {
        if rule.path.is_empty() {
            return Err(RegistryError::EmptyPath(name.to_string()));
        }
        current = match &rule.fallback {
            Fallback::Rule(next) => Some(next.as_ref()),
            _ => None,
        };
    }
    Ok(())
}

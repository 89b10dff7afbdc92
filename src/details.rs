//! App detail record assembly

use std::sync::LazyLock;

use serde_json::Value;
use url::Url;

use crate::errors::PayloadError;
use crate::payload::{parse_page, site_language, site_location};
use crate::registry::{ExtractionResult, FieldRegistry};
use crate::transform::STORE_ORIGIN;

static DETAILS: LazyLock<FieldRegistry> = LazyLock::new(FieldRegistry::details);

/// Canonical detail page URL of an app
pub fn details_url(app_id: &str) -> String {
    match Url::parse(STORE_ORIGIN).and_then(|base| base.join("/store/apps/details")) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("id", app_id);
            url.into()
        }
        Err(_) => format!("{STORE_ORIGIN}/store/apps/details?id={app_id}"),
    }
}

/// Full detail record of `app_id` from an already decoded page payload.
///
/// Identity and site fields come first, followed by every field of the
/// detail catalog in catalog order.
pub fn app_details(app_id: &str, payload: &Value) -> ExtractionResult {
    let mut result = ExtractionResult::default();
    result.insert("appId", Value::from(app_id));
    result.insert("url", Value::from(details_url(app_id)));
    result.insert(
        "siteLocation",
        site_location(payload).cloned().unwrap_or(Value::Null),
    );
    result.insert(
        "siteLanguage",
        site_language(payload).cloned().unwrap_or(Value::Null),
    );

    result.values.extend(DETAILS.extract_all(payload).values);
    result
}

/// Decode a detail page and extract its record.
pub fn app_details_from_page(app_id: &str, html: &str) -> Result<ExtractionResult, PayloadError> {
    let payload = parse_page(html)?;
    Ok(app_details(app_id, &payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_details_url() {
        assert_eq!(
            details_url("com.example.app"),
            "https://play.google.com/store/apps/details?id=com.example.app"
        );
    }

    #[test]
    fn test_app_details_leading_fields() {
        let payload = json!({
            "ds:5": [null, [null, null, [["Example"]]]],
            "ds:12": [null, null, null, null, "DE", "de"]
        });
        let result = app_details("com.example", &payload);
        let keys: Vec<_> = result.values.keys().take(5).map(String::as_str).collect();

        assert_eq!(keys, vec!["appId", "url", "siteLocation", "siteLanguage", "title"]);
        assert_eq!(result.get("siteLocation"), Some(&json!("DE")));
        assert_eq!(result.get("title"), Some(&json!("Example")));
        assert_eq!(result.len(), 4 + DETAILS.len());
    }

    #[test]
    fn test_app_details_from_page_without_data() {
        assert!(app_details_from_page("x", "<html></html>").is_err());
    }
}

//! Parsed OpenWrap response.

use std::collections::BTreeMap;

use error_stack::{Report, ResultExt};
use serde_json::Value;

use crate::error::OpenWrapError;
use crate::util::stringify_value;

/// Key under which the server may nest the targeting map.
const TARGETING_KEY: &str = "targeting";

/// Targeting key-values returned by OpenWrap for one ad request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdResponse {
    targeting_info: BTreeMap<String, String>,
}

impl AdResponse {
    /// Builds a response from a decoded JSON payload.
    ///
    /// The payload must be an object. A nested `"targeting"` object takes
    /// precedence over the top level. Values are stringified, `null`s are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`OpenWrapError::InvalidResponse`] if the payload is not an
    /// object or a value is itself an object.
    pub fn from_json(payload: &Value) -> Result<Self, Report<OpenWrapError>> {
        let root = payload.as_object().ok_or_else(|| {
            Report::new(OpenWrapError::InvalidResponse {
                message: "payload is not a JSON object".to_string(),
            })
        })?;

        let source = match root.get(TARGETING_KEY) {
            Some(Value::Object(targeting)) => targeting,
            _ => root,
        };

        let mut targeting_info = BTreeMap::new();
        for (key, value) in source {
            if value.is_null() {
                continue;
            }
            let text = stringify_value(value).ok_or_else(|| {
                Report::new(OpenWrapError::InvalidResponse {
                    message: format!("value of '{}' is not a scalar", key),
                })
            })?;
            targeting_info.insert(key.clone(), text);
        }

        log::debug!("Parsed {} targeting key(s)", targeting_info.len());
        Ok(Self { targeting_info })
    }

    /// Parses raw response bytes.
    ///
    /// # Errors
    ///
    /// Returns [`OpenWrapError::InvalidResponse`] if the body is not JSON or
    /// does not satisfy [`AdResponse::from_json`].
    pub fn from_slice(body: &[u8]) -> Result<Self, Report<OpenWrapError>> {
        let payload: Value =
            serde_json::from_slice(body).change_context(OpenWrapError::InvalidResponse {
                message: "body is not valid JSON".to_string(),
            })?;
        Self::from_json(&payload)
    }

    /// Targeting information as a flat map.
    #[must_use]
    pub fn targeting_info(&self) -> &BTreeMap<String, String> {
        &self.targeting_info
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targeting_info.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_payload() {
        let response = AdResponse::from_json(&json!({
            "pwtecp": "5.00",
            "pwtbst": 1,
            "pwtpid": "pubmatic",
            "pwtplt": "video",
            "pwtsz": "640x480"
        }))
        .expect("should parse");

        let expected: BTreeMap<String, String> = [
            ("pwtecp", "5.00"),
            ("pwtbst", "1"),
            ("pwtpid", "pubmatic"),
            ("pwtplt", "video"),
            ("pwtsz", "640x480"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(response.targeting_info(), &expected);
    }

    #[test]
    fn test_nested_targeting_object_wins() {
        let response = AdResponse::from_json(&json!({
            "id": "abc",
            "targeting": { "pwtecp": "1.20", "pwtdeal": ["d1", "d2"] }
        }))
        .expect("should parse");

        assert_eq!(response.targeting_info().len(), 2);
        assert_eq!(response.targeting_info()["pwtdeal"], "d1,d2");
        assert!(!response.targeting_info().contains_key("id"));
    }

    #[test]
    fn test_nulls_are_skipped() {
        let response = AdResponse::from_json(&json!({ "pwtecp": null, "pwtbst": true }))
            .expect("should parse");
        assert_eq!(response.targeting_info().len(), 1);
        assert_eq!(response.targeting_info()["pwtbst"], "true");
    }

    #[test]
    fn test_nulls_inside_lists_are_skipped() {
        let response = AdResponse::from_json(&json!({ "pwtdeal": ["d1", null, "d2"] }))
            .expect("should parse");
        assert_eq!(response.targeting_info()["pwtdeal"], "d1,d2");
    }

    #[test]
    fn test_empty_object_is_valid_no_bid() {
        let response = AdResponse::from_slice(b"{}").expect("should parse");
        assert!(response.is_empty());
    }

    #[test]
    fn test_rejects_non_object_payload() {
        let err = AdResponse::from_json(&json!(["a", "b"])).unwrap_err();
        assert!(matches!(
            err.current_context(),
            OpenWrapError::InvalidResponse { .. }
        ));
    }

    #[test]
    fn test_rejects_nested_values() {
        let err = AdResponse::from_json(&json!({ "ext": { "a": 1 } })).unwrap_err();
        assert!(matches!(
            err.current_context(),
            OpenWrapError::InvalidResponse { .. }
        ));
    }

    #[test]
    fn test_rejects_invalid_json() {
        let err = AdResponse::from_slice(b"<VAST/>").unwrap_err();
        assert!(matches!(
            err.current_context(),
            OpenWrapError::InvalidResponse { .. }
        ));
    }
}

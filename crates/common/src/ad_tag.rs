//! DFP (Google Ad Manager) VAST ad tag for the IMA player.
//!
//! OpenWrap's targeting is forwarded to DFP through `cust_params`, so the
//! line items set up for OpenWrap bids can win the DFP auction. The ad unit
//! and size are the same values used for the OpenWrap request.

use url::Url;
use uuid::Uuid;

use crate::models::ad_request::AdRequest;
use crate::models::ad_response::AdResponse;
use crate::models::configuration::Configuration;
use crate::util::{bool_flag, to_query_string, SafeParams};

/// Default DFP ad server endpoint.
pub const DEFAULT_AD_TAG_BASE_URL: &str = "https://pubads.g.doubleclick.net/gampad/ads";

/// Builds VAST ad tag URLs for one ad server endpoint.
#[derive(Debug, Clone)]
pub struct AdTagBuilder {
    base_url: Url,
    correlator: String,
}

impl AdTagBuilder {
    /// Creates a builder with a fresh random correlator.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            correlator: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Replaces the correlator, e.g. to tie several tags to one page view.
    #[must_use]
    pub fn with_correlator(mut self, correlator: impl Into<String>) -> Self {
        self.correlator = correlator.into();
        self
    }

    #[must_use]
    pub fn correlator(&self) -> &str {
        &self.correlator
    }

    /// Ad tag URL for `request`, carrying the OpenWrap targeting if any.
    #[must_use]
    pub fn build(
        &self,
        request: &AdRequest,
        response: Option<&AdResponse>,
        config: &Configuration,
    ) -> Url {
        let mut params = SafeParams::new();
        params.set_safely("iu", Some(request.ad_unit_id()));
        params.set_safely("sz", Some(request.size().to_string()));
        params.set_safely("gdfp_req", Some("1"));
        params.set_safely("env", Some("vp"));
        params.set_safely("output", Some("vast"));
        params.set_safely("unviewed_position_start", Some("1"));
        params.set_safely("correlator", Some(&self.correlator));

        if let Some(targeting) = response.map(AdResponse::targeting_info) {
            let cust_params = to_query_string(
                targeting.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                true,
            );
            params.set_safely("cust_params", Some(cust_params));
        }

        params.set_safely("gdpr", config.gdpr_enabled.map(bool_flag));
        params.set_safely("gdpr_consent", config.gdpr_consent.as_ref());
        params.set_safely("us_privacy", config.effective_ccpa());

        let mut url = self.base_url.clone();
        url.set_query(Some(&params.to_query_string(true)));

        log::debug!("Ad tag URL: {}", url);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ad_request::AdSize;
    use crate::models::configuration::US_PRIVACY_ENV_KEY;
    use serde_json::json;
    use std::collections::HashMap;

    fn builder() -> AdTagBuilder {
        AdTagBuilder::new(Url::parse(DEFAULT_AD_TAG_BASE_URL).expect("valid url"))
            .with_correlator("12345")
    }

    fn request() -> AdRequest {
        AdRequest::new("156276", 1165, "/15671365/pm_sdk/video", AdSize::new(640, 480))
            .expect("valid request")
    }

    fn query(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn test_base_parameters() {
        temp_env::with_var_unset(US_PRIVACY_ENV_KEY, || {
            let url = builder().build(&request(), None, &Configuration::default());
            assert!(url.as_str().starts_with(DEFAULT_AD_TAG_BASE_URL));

            let q = query(&url);
            assert_eq!(q["iu"], "/15671365/pm_sdk/video");
            assert_eq!(q["sz"], "640x480");
            assert_eq!(q["output"], "vast");
            assert_eq!(q["env"], "vp");
            assert_eq!(q["correlator"], "12345");
            assert!(!q.contains_key("cust_params"));
            assert!(!q.contains_key("gdpr"));
            assert!(!q.contains_key("us_privacy"));
        });
    }

    #[test]
    fn test_cust_params_carry_targeting() {
        let response = AdResponse::from_json(&json!({
            "pwtecp": "5.00",
            "pwtpid": "pubmatic",
            "pwtdeal": "a&b"
        }))
        .expect("should parse");

        let url = builder().build(&request(), Some(&response), &Configuration::default());
        let q = query(&url);
        assert_eq!(
            q["cust_params"],
            "pwtdeal=a%26b&pwtecp=5.00&pwtpid=pubmatic"
        );
    }

    #[test]
    fn test_cust_params_encode_targeting_keys() {
        let response = AdResponse::from_json(&json!({
            "a&b": "1",
            "c=d": "2",
            "e f": "3"
        }))
        .expect("should parse");

        let url = builder().build(&request(), Some(&response), &Configuration::default());
        let q = query(&url);
        assert_eq!(q["cust_params"], "a%26b=1&c%3Dd=2&e%20f=3");
        assert!(!q.contains_key("b"));
        assert!(!q.contains_key("c"));

        let inner: HashMap<String, String> =
            url::form_urlencoded::parse(q["cust_params"].as_bytes())
                .into_owned()
                .collect();
        assert_eq!(inner.len(), 3);
        assert_eq!(inner["a&b"], "1");
        assert_eq!(inner["c=d"], "2");
        assert_eq!(inner["e f"], "3");
    }

    #[test]
    fn test_empty_targeting_omits_cust_params() {
        let response = AdResponse::from_json(&json!({})).expect("should parse");
        let url = builder().build(&request(), Some(&response), &Configuration::default());
        assert!(!query(&url).contains_key("cust_params"));
    }

    #[test]
    fn test_consent_is_mirrored() {
        let config = Configuration {
            gdpr_enabled: Some(true),
            gdpr_consent: Some("CONSENT".to_string()),
            ccpa: Some("1YNN".to_string()),
            ..Default::default()
        };
        let q = query(&builder().build(&request(), None, &config));
        assert_eq!(q["gdpr"], "1");
        assert_eq!(q["gdpr_consent"], "CONSENT");
        assert_eq!(q["us_privacy"], "1YNN");
    }

    #[test]
    fn test_correlators_are_unique() {
        let base = Url::parse(DEFAULT_AD_TAG_BASE_URL).expect("valid url");
        let a = AdTagBuilder::new(base.clone());
        let b = AdTagBuilder::new(base);
        assert_ne!(a.correlator(), b.correlator());
        assert_eq!(a.correlator().len(), 32);
    }
}

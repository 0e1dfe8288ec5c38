//! OpenWrap ad request model and its URL encoding.
//!
//! The host creates one [`AdRequest`] per ad slot, sets the optional fields
//! and hands it to the ads loader. The request is encoded once, as a GET with
//! every parameter in the query string:
//!
//! ```text
//! https://ow.pubmatic.com/openrtb/2.5/video?pubId=156276&profId=1165&adUnitId=...&sz=640x480&f=json&...
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use error_stack::{Report, ResultExt};
use http::header::{ACCEPT, USER_AGENT};
use http::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::OpenWrapError;
use crate::models::configuration::Configuration;
use crate::util::{bool_flag, gender_code, local_utc_offset_minutes, SafeParams};

/// Default network timeout for an ad request.
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(5);

/// Smallest network timeout accepted by [`AdRequest::set_network_timeout`].
pub const MIN_NETWORK_TIMEOUT: Duration = Duration::from_secs(1);

pub const PARAM_PUB_ID: &str = "pubId";
pub const PARAM_PROFILE_ID: &str = "profId";
pub const PARAM_AD_UNIT_ID: &str = "adUnitId";
pub const PARAM_SIZE: &str = "sz";

/// Parameters owned by the request builder. Custom key-values may not use them.
pub const RESERVED_PARAMS: &[&str] = &[
    PARAM_PUB_ID,
    PARAM_PROFILE_ID,
    PARAM_AD_UNIT_ID,
    PARAM_SIZE,
    "pwtv",
    "pwtdebug",
    "f",
    "owLinearity",
    "gdpr",
    "gdpr_consent",
    "us_privacy",
    "ifa",
    "ifa_hash",
    "utcOffset",
    "appId",
    "appName",
    "appDomain",
    "storeUrl",
    "appCat",
    "appPaid",
    "yob",
    "gender",
    "metro",
    "zip",
    "city",
    "country",
    "lat",
    "lon",
    "locSource",
    "bidderParams",
];

/// Video player size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdSize {
    pub width: u32,
    pub height: u32,
}

impl AdSize {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for AdSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for AdSize {
    type Err = Report<OpenWrapError>;

    /// Parses `"640x480"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            Report::new(OpenWrapError::InvalidRequest {
                message: format!("Invalid ad size '{}', expected WIDTHxHEIGHT", s),
            })
        };
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        Ok(Self { width, height })
    }
}

/// One partner keyword; several values for the same key are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub key: String,
    pub value: Vec<String>,
}

/// Keywords passed to a single bidder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidderKeywords {
    pub keywords: Vec<Keyword>,
}

/// Partner-specific keywords keyed by bidder name, e.g. `"pubmatic"`.
pub type BidderCustomParams = BTreeMap<String, BidderKeywords>;

/// Parameters of a single OpenWrap ad request.
#[derive(Debug, Clone, PartialEq)]
pub struct AdRequest {
    pub_id: String,
    profile_id: u32,
    ad_unit_id: String,
    size: AdSize,
    /// Profile version. Only for profiles in draft/staging state.
    pub version_id: Option<u32>,
    /// Ask the server for debug information. Never enable in production.
    pub debug: bool,
    pub bidder_custom_params: Option<BidderCustomParams>,
    network_timeout: Duration,
}

impl AdRequest {
    /// Creates a request for one ad slot.
    ///
    /// # Errors
    ///
    /// Returns [`OpenWrapError::InvalidRequest`] when the publisher id or ad
    /// unit id is blank, or when either dimension of `size` is zero.
    pub fn new(
        pub_id: impl Into<String>,
        profile_id: u32,
        ad_unit_id: impl Into<String>,
        size: AdSize,
    ) -> Result<Self, Report<OpenWrapError>> {
        let pub_id = pub_id.into();
        let ad_unit_id = ad_unit_id.into();

        if pub_id.trim().is_empty() {
            return Err(Report::new(OpenWrapError::InvalidRequest {
                message: "publisher id must not be empty".to_string(),
            }));
        }
        if ad_unit_id.trim().is_empty() {
            return Err(Report::new(OpenWrapError::InvalidRequest {
                message: "ad unit id must not be empty".to_string(),
            }));
        }
        if size.width == 0 || size.height == 0 {
            return Err(Report::new(OpenWrapError::InvalidRequest {
                message: format!("ad size {} must be non-zero", size),
            }));
        }

        Ok(Self {
            pub_id,
            profile_id,
            ad_unit_id,
            size,
            version_id: None,
            debug: false,
            bidder_custom_params: None,
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
        })
    }

    #[must_use]
    pub fn pub_id(&self) -> &str {
        &self.pub_id
    }

    #[must_use]
    pub fn profile_id(&self) -> u32 {
        self.profile_id
    }

    /// Ad unit id, shared by the OpenWrap and DFP requests.
    #[must_use]
    pub fn ad_unit_id(&self) -> &str {
        &self.ad_unit_id
    }

    /// Video size, shared by the OpenWrap and DFP requests.
    #[must_use]
    pub fn size(&self) -> AdSize {
        self.size
    }

    #[must_use]
    pub fn network_timeout(&self) -> Duration {
        self.network_timeout
    }

    /// Sets the network timeout. Values under one second are ignored.
    pub fn set_network_timeout(&mut self, timeout: Duration) {
        if timeout < MIN_NETWORK_TIMEOUT {
            log::warn!(
                "Ignoring network timeout of {:?}, minimum is {:?}",
                timeout,
                MIN_NETWORK_TIMEOUT
            );
            return;
        }
        self.network_timeout = timeout;
    }

    /// Builds the GET request sent to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`OpenWrapError::InvalidRequest`] if the bidder params cannot
    /// be serialized or the resulting URL is rejected.
    pub fn to_http_request(
        &self,
        config: &Configuration,
        endpoint: &Url,
    ) -> Result<http::Request<()>, Report<OpenWrapError>> {
        let params = self.build_params(config, local_utc_offset_minutes())?;
        let url = request_url(endpoint, &params);

        log::debug!("OpenWrap request URL: {}", url);

        http::Request::builder()
            .method(Method::GET)
            .uri(url.as_str())
            .header(ACCEPT, "application/json")
            .header(
                USER_AGENT,
                concat!("openwrap-client/", env!("CARGO_PKG_VERSION")),
            )
            .body(())
            .change_context(OpenWrapError::InvalidRequest {
                message: "Failed to build HTTP request".to_string(),
            })
    }

    /// Collects every query parameter in wire order.
    pub(crate) fn build_params(
        &self,
        config: &Configuration,
        utc_offset_minutes: i32,
    ) -> Result<SafeParams, Report<OpenWrapError>> {
        let mut params = SafeParams::new();

        params.set_safely(PARAM_PUB_ID, Some(&self.pub_id));
        params.set_safely(PARAM_PROFILE_ID, Some(self.profile_id.to_string()));
        params.set_safely(PARAM_AD_UNIT_ID, Some(&self.ad_unit_id));
        params.set_safely(PARAM_SIZE, Some(self.size.to_string()));
        params.set_safely("pwtv", self.version_id.map(|v| v.to_string()));
        if self.debug {
            params.set_safely("pwtdebug", Some("1"));
        }
        params.set_safely("f", Some("json"));
        params.set_safely("owLinearity", Some(config.linearity.code().to_string()));

        // Consent
        params.set_safely("gdpr", config.gdpr_enabled.map(bool_flag));
        params.set_safely("gdpr_consent", config.gdpr_consent.as_ref());
        params.set_safely("us_privacy", config.effective_ccpa());

        // Device
        if let Some(ifa) = config.hashed_advertising_id() {
            params.set_safely("ifa", Some(ifa));
            params.set_safely(
                "ifa_hash",
                Some(config.advertising_id_hash.code().to_string()),
            );
        }
        params.set_safely("utcOffset", Some(utc_offset_minutes.to_string()));

        if let Some(app) = &config.app_info {
            params.set_safely("appId", Some(app.app_id()));
            params.set_safely("appName", Some(app.name()));
            params.set_safely("appDomain", app.domain.as_ref());
            params.set_safely("storeUrl", app.store_url.as_ref());
            params.set_safely("appCat", app.normalized_categories());
            params.set_safely("appPaid", app.paid.map(bool_flag));
        }

        if let Some(user) = config.user_info.as_ref().map(|u| u.sanitized()) {
            params.set_safely("yob", user.birth_year.map(|y| y.to_string()));
            params.set_safely("gender", user.gender.map(gender_code));
            params.set_safely("metro", user.metro.as_ref());
            params.set_safely("zip", user.zip.as_ref());
            params.set_safely("city", user.city.as_ref());
            params.set_safely("country", user.country.as_ref());
            if let Some(location) = user.location {
                params.set_safely("lat", Some(location.latitude.to_string()));
                params.set_safely("lon", Some(location.longitude.to_string()));
                params.set_safely(
                    "locSource",
                    user.location_source.map(|s| s.code().to_string()),
                );
            }
        }

        if let Some(bidder_params) = self.bidder_custom_params.as_ref().filter(|p| !p.is_empty())
        {
            let json = serde_json::to_string(bidder_params).change_context(
                OpenWrapError::InvalidRequest {
                    message: "Failed to serialize bidder custom params".to_string(),
                },
            )?;
            params.set_safely("bidderParams", Some(json));
        }

        for (key, value) in &config.custom_key_values {
            if RESERVED_PARAMS.contains(&key.as_str()) {
                log::warn!("Skipping custom key-value '{}': reserved parameter", key);
                continue;
            }
            params.set_safely(key, Some(value));
        }

        Ok(params)
    }
}

fn request_url(endpoint: &Url, params: &SafeParams) -> Url {
    let mut url = endpoint.clone();
    let encoded = params.to_query_string(true);
    let query = match endpoint.query().filter(|q| !q.is_empty()) {
        Some(existing) => format!("{}&{}", existing, encoded),
        None => encoded,
    };
    url.set_query(Some(&query));
    url
}

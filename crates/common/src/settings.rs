use std::collections::BTreeMap;

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;
use validator::Validate;

use crate::ad_tag::DEFAULT_AD_TAG_BASE_URL;
use crate::error::OpenWrapError;
use crate::models::app_info::ApplicationInfo;
use crate::models::configuration::{Configuration, CustomValue, HashType, LinearityType};
use crate::models::user_info::UserInfo;

/// Prefix of environment variables overriding the TOML settings, e.g.
/// `OPENWRAP__OPENWRAP__ENDPOINT`.
pub const ENVIRONMENT_VARIABLE_PREFIX: &str = "OPENWRAP";
pub const ENVIRONMENT_VARIABLE_SEPARATOR: &str = "__";

fn default_timeout_secs() -> u64 {
    5
}

fn default_ad_tag_base_url() -> String {
    DEFAULT_AD_TAG_BASE_URL.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct OpenWrap {
    #[validate(url)]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1))]
    pub default_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AdTag {
    #[validate(url)]
    #[serde(default = "default_ad_tag_base_url")]
    pub base_url: String,
}

impl Default for AdTag {
    fn default() -> Self {
        Self {
            base_url: default_ad_tag_base_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Consent {
    pub gdpr_enabled: Option<bool>,
    pub gdpr_consent: Option<String>,
    pub ccpa: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Device {
    pub advertising_id: Option<String>,
    #[serde(default)]
    pub hash: HashType,
    #[serde(default)]
    pub linearity: LinearityType,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub openwrap: OpenWrap,
    #[serde(default)]
    #[validate(nested)]
    pub ad_tag: AdTag,
    #[serde(default)]
    pub consent: Consent,
    #[serde(default)]
    pub device: Device,
    pub app: Option<ApplicationInfo>,
    pub user: Option<UserInfo>,
    #[serde(default)]
    pub custom_key_values: BTreeMap<String, CustomValue>,
}

impl Settings {
    /// Loads the settings bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns [`OpenWrapError::Configuration`] if the bundled TOML is invalid.
    pub fn new() -> Result<Self, Report<OpenWrapError>> {
        let toml_str = include_str!("../../../openwrap.toml");
        Self::from_toml(toml_str)
    }

    /// Parses TOML, applies `OPENWRAP__` environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns [`OpenWrapError::Configuration`] on syntax errors, missing
    /// required fields or failed validation.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<OpenWrapError>> {
        let environment = Environment::default()
            .prefix(ENVIRONMENT_VARIABLE_PREFIX)
            .separator(ENVIRONMENT_VARIABLE_SEPARATOR);

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let config = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(OpenWrapError::Configuration {
                message: "Failed to build configuration".to_string(),
            })?;

        let settings: Self =
            config
                .try_deserialize()
                .change_context(OpenWrapError::Configuration {
                    message: "Failed to deserialize configuration".to_string(),
                })?;

        settings
            .validate()
            .change_context(OpenWrapError::Configuration {
                message: "Settings validation failed".to_string(),
            })?;

        Ok(settings)
    }

    /// Effective settings serialized back to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`OpenWrapError::Configuration`] if serialization fails.
    pub fn to_canonical_toml(&self) -> Result<String, Report<OpenWrapError>> {
        toml::to_string_pretty(self).change_context(OpenWrapError::Configuration {
            message: "Failed to serialize settings".to_string(),
        })
    }

    /// SHA-256 of the canonical TOML as `sha256:<hex>`, so two hosts can
    /// tell whether they run with the same effective settings.
    ///
    /// # Errors
    ///
    /// Returns [`OpenWrapError::Configuration`] if serialization fails.
    pub fn fingerprint(&self) -> Result<String, Report<OpenWrapError>> {
        let canonical = self.to_canonical_toml()?.replace("\r\n", "\n");
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(format!("sha256:{}", hex::encode(digest)))
    }

    /// # Errors
    ///
    /// Returns [`OpenWrapError::Configuration`] if the endpoint is not a URL.
    pub fn endpoint_url(&self) -> Result<Url, Report<OpenWrapError>> {
        Url::parse(&self.openwrap.endpoint).change_context(OpenWrapError::Configuration {
            message: format!("Invalid OpenWrap endpoint '{}'", self.openwrap.endpoint),
        })
    }

    /// # Errors
    ///
    /// Returns [`OpenWrapError::Configuration`] if the base URL is not a URL.
    pub fn ad_tag_base_url(&self) -> Result<Url, Report<OpenWrapError>> {
        Url::parse(&self.ad_tag.base_url).change_context(OpenWrapError::Configuration {
            message: format!("Invalid ad tag base URL '{}'", self.ad_tag.base_url),
        })
    }

    /// The request-independent [`Configuration`] these settings describe.
    #[must_use]
    pub fn to_configuration(&self) -> Configuration {
        Configuration {
            user_info: self.user.clone(),
            app_info: self.app.clone(),
            gdpr_enabled: self.consent.gdpr_enabled,
            gdpr_consent: self.consent.gdpr_consent.clone(),
            ccpa: self.consent.ccpa.clone(),
            linearity: self.device.linearity,
            advertising_id_hash: self.device.hash,
            advertising_id: self.device.advertising_id.clone(),
            custom_key_values: self.custom_key_values.clone(),
        }
    }
}

//! Request-independent settings applied to every OpenWrap ad request.
//!
//! The host creates one [`Configuration`] and shares it (usually as an
//! `Arc<Configuration>`) with every loader. It is read, never mutated, while
//! requests are being built.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::app_info::ApplicationInfo;
use crate::models::user_info::UserInfo;
use crate::util::{hash_md5, hash_sha1, ParamValue};

/// Environment variable consulted for the US privacy string when none is set.
pub const US_PRIVACY_ENV_KEY: &str = "IABUSPrivacy_String";

/// Linearity of the requested video ad.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearityType {
    #[default]
    Linear = 1,
    NonLinear,
}

impl LinearityType {
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Hashing applied to the advertising id before it leaves the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashType {
    #[default]
    Raw = 1,
    Sha1,
    Md5,
}

impl HashType {
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn apply(self, value: &str) -> String {
        match self {
            Self::Raw => value.to_string(),
            Self::Sha1 => hash_sha1(value),
            Self::Md5 => hash_md5(value),
        }
    }
}

/// Custom key-value: a single string, or several values for the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomValue {
    Single(String),
    Multiple(Vec<String>),
}

impl From<&CustomValue> for ParamValue {
    fn from(value: &CustomValue) -> Self {
        match value {
            CustomValue::Single(s) => ParamValue::Text(s.clone()),
            CustomValue::Multiple(values) => ParamValue::List(values.clone()),
        }
    }
}

/// Global settings for the OpenWrap module: consent, user, app and device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    pub user_info: Option<UserInfo>,
    pub app_info: Option<ApplicationInfo>,
    /// Whether the request is subject to GDPR. Omitted when unset.
    pub gdpr_enabled: Option<bool>,
    /// Base64 TCF consent string.
    pub gdpr_consent: Option<String>,
    /// IAB US privacy (CCPA) string.
    pub ccpa: Option<String>,
    pub linearity: LinearityType,
    pub advertising_id_hash: HashType,
    /// Raw advertising id (IFA) of the device.
    pub advertising_id: Option<String>,
    pub custom_key_values: BTreeMap<String, CustomValue>,
}

impl Configuration {
    /// The advertising id with [`Configuration::advertising_id_hash`] applied.
    #[must_use]
    pub fn hashed_advertising_id(&self) -> Option<String> {
        self.advertising_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| self.advertising_id_hash.apply(id))
    }

    /// US privacy string to send. The explicit value wins over the
    /// `IABUSPrivacy_String` environment variable.
    #[must_use]
    pub fn effective_ccpa(&self) -> Option<String> {
        self.ccpa
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var(US_PRIVACY_ENV_KEY).ok())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IFA: &str = "E621E1F8-C36C-495A-93FC-0C247A3E6E5F";

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert_eq!(config.linearity, LinearityType::Linear);
        assert_eq!(config.advertising_id_hash, HashType::Raw);
        assert_eq!(config.gdpr_enabled, None);
        assert!(config.custom_key_values.is_empty());
    }

    #[test]
    fn test_hashed_advertising_id() {
        let mut config = Configuration {
            advertising_id: Some(IFA.to_string()),
            ..Default::default()
        };
        assert_eq!(config.hashed_advertising_id().as_deref(), Some(IFA));

        config.advertising_id_hash = HashType::Sha1;
        assert_eq!(config.hashed_advertising_id(), Some(hash_sha1(IFA)));

        config.advertising_id_hash = HashType::Md5;
        assert_eq!(config.hashed_advertising_id(), Some(hash_md5(IFA)));
    }

    #[test]
    fn test_empty_advertising_id_is_omitted() {
        let config = Configuration {
            advertising_id: Some(String::new()),
            advertising_id_hash: HashType::Md5,
            ..Default::default()
        };
        assert_eq!(config.hashed_advertising_id(), None);
    }

    #[test]
    fn test_ccpa_falls_back_to_env() {
        temp_env::with_var(US_PRIVACY_ENV_KEY, Some("1YNN"), || {
            let config = Configuration::default();
            assert_eq!(config.effective_ccpa().as_deref(), Some("1YNN"));
        });
    }

    #[test]
    fn test_explicit_ccpa_wins_over_env() {
        temp_env::with_var(US_PRIVACY_ENV_KEY, Some("1YNN"), || {
            let config = Configuration {
                ccpa: Some("1NYN".to_string()),
                ..Default::default()
            };
            assert_eq!(config.effective_ccpa().as_deref(), Some("1NYN"));
        });
    }

    #[test]
    fn test_ccpa_absent_everywhere() {
        temp_env::with_var_unset(US_PRIVACY_ENV_KEY, || {
            assert_eq!(Configuration::default().effective_ccpa(), None);
        });
    }

    #[test]
    fn test_custom_value_deserializes_both_shapes() {
        let values: BTreeMap<String, CustomValue> = toml::from_str(
            r#"
            genre = "sports"
            tags = ["a", "b"]
            "#,
        )
        .expect("should parse custom values");
        assert_eq!(values["genre"], CustomValue::Single("sports".to_string()));
        assert_eq!(
            values["tags"],
            CustomValue::Multiple(vec!["a".to_string(), "b".to_string()])
        );
    }
}

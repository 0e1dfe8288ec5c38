//! Helpers shared by the request builder, the response parser and the
//! ad tag builder.

use chrono::{FixedOffset, Local};
use error_stack::Report;
use http::StatusCode;
use md5::Md5;
use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::error::OpenWrapError;
use crate::models::user_info::Gender;

/// Validates an HTTP status and body before parsing.
///
/// # Errors
///
/// - [`OpenWrapError::HttpStatus`] for any non-2xx status
/// - [`OpenWrapError::InvalidResponse`] for a 2xx status with an empty body
pub fn check_for_ok_response(
    status: StatusCode,
    body: &[u8],
) -> Result<(), Report<OpenWrapError>> {
    if !status.is_success() {
        return Err(Report::new(OpenWrapError::HttpStatus {
            status: status.as_u16(),
        }));
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Report::new(OpenWrapError::InvalidResponse {
            message: format!("empty body with HTTP {}", status.as_u16()),
        }));
    }
    Ok(())
}

/// Offset of `offset` from UTC in minutes, e.g. `-300` for UTC-05:00.
#[must_use]
pub fn utc_offset_minutes(offset: &FixedOffset) -> i32 {
    offset.local_minus_utc() / 60
}

/// UTC offset of the device's local timezone in minutes.
#[must_use]
pub fn local_utc_offset_minutes() -> i32 {
    utc_offset_minutes(Local::now().offset())
}

/// Percent-encodes a query component.
#[must_use]
pub fn url_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Lowercase hex SHA-1 digest.
#[must_use]
pub fn hash_sha1(value: &str) -> String {
    hex::encode(Sha1::digest(value.as_bytes()))
}

/// Lowercase hex MD5 digest.
#[must_use]
pub fn hash_md5(value: &str) -> String {
    hex::encode(Md5::digest(value.as_bytes()))
}

/// Single-letter gender code sent to the ad server.
#[must_use]
pub fn gender_code(gender: Gender) -> &'static str {
    match gender {
        Gender::Other => "O",
        Gender::Male => "M",
        Gender::Female => "F",
    }
}

/// Turns a JSON scalar (or a list of scalars) into its wire string.
///
/// Returns `None` for `null` and for anything containing an object. Nulls
/// inside a list are skipped like top-level nulls.
#[must_use]
pub fn stringify_value(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Object(_) => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| match item {
                Value::Array(_) => None,
                other => stringify_value(other),
            })
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join(",")),
    }
}

/// `"1"` for true, `"0"` for false.
#[must_use]
pub fn bool_flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Joins pairs into `k1=v1&k2=v2`, percent-encoding keys and values when
/// `encode` is set.
#[must_use]
pub fn to_query_string<'a, I>(pairs: I, encode: bool) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| {
            if encode {
                format!("{}={}", url_encode(key), url_encode(value))
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// A parameter value: either a single string or a list sent comma separated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    List(Vec<String>),
}

impl ParamValue {
    fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }

    /// Wire representation, lists joined with `,`.
    #[must_use]
    pub fn to_wire(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::List(items) => items.join(","),
        }
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Insertion-ordered parameter map that never stores empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeParams {
    entries: Vec<(String, ParamValue)>,
}

impl SafeParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key` unless it is `None`, an empty string or an
    /// empty list. An existing key keeps its position and takes the new value.
    pub fn set_safely<V: Into<ParamValue>>(&mut self, key: &str, value: Option<V>) {
        let Some(value) = value.map(Into::into) else {
            return;
        };
        if value.is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key/wire-value pairs in insertion order.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_wire()))
            .collect()
    }

    /// `k1=v1&k2=v2`, optionally percent-encoded.
    #[must_use]
    pub fn to_query_string(&self, encode: bool) -> String {
        let pairs = self.to_pairs();
        to_query_string(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())), encode)
    }
}

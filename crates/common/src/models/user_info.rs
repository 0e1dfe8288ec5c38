//! User attributes that help deliver more relevant ads.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// User gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Other = 1,
    Male,
    Female,
}

/// How the user's location was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Gps = 1,
    IpAddress,
    UserProvided,
}

impl LocationSource {
    /// OpenRTB location type code.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Geographic coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Location {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// User information supplied by the host application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserInfo {
    /// Year of birth, YYYY.
    #[validate(range(min = 1900, max = 2100))]
    pub birth_year: Option<u32>,
    pub gender: Option<Gender>,
    /// Google metro code, e.g. "501" for New York.
    pub metro: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    /// ISO-3166-1 alpha-3 country code, e.g. "USA".
    #[validate(length(equal = 3))]
    pub country: Option<String>,
    #[validate(nested)]
    pub location: Option<Location>,
    pub location_source: Option<LocationSource>,
}

impl UserInfo {
    /// Returns a copy with every field that fails validation removed.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut clean = self.clone();
        if let Err(errors) = self.validate() {
            for field in errors.errors().keys() {
                log::warn!("Dropping invalid user info field '{}'", field);
                match &**field {
                    "birth_year" => clean.birth_year = None,
                    "country" => clean.country = None,
                    "location" => clean.location = None,
                    _ => {}
                }
            }
        }
        if let Some(country) = &clean.country {
            if !country.chars().all(|c| c.is_ascii_alphabetic()) {
                log::warn!("Dropping non-alphabetic country code '{}'", country);
                clean.country = None;
            }
        }
        clean
    }
}

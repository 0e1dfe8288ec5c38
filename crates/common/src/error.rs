//! Error types for the OpenWrap client.
//!
//! Every fallible operation returns `Result<T, Report<OpenWrapError>>`. The
//! [`OpenWrapError`] context carries a stable numeric code and a description,
//! which is what the ad loader hands to the host application on failure.

use derive_more::{Display, Error};

/// Errors raised while building, sending or parsing an OpenWrap ad request.
#[derive(Debug, Display, Error)]
pub enum OpenWrapError {
    /// The ad request could not be built or encoded.
    #[display("Invalid ad request: {message}")]
    InvalidRequest { message: String },

    /// Transport failure, including timeouts.
    #[display("Network error: {message}")]
    Network { message: String },

    /// The ad server answered with a non-2xx status.
    #[display("Ad server returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// The payload was empty, not JSON, or not a flat key/value object.
    #[display("Invalid ad response: {message}")]
    InvalidResponse { message: String },

    /// Settings failed to load or validate.
    #[display("Configuration error: {message}")]
    Configuration { message: String },
}

impl OpenWrapError {
    /// Numeric error code reported alongside the description.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidRequest { .. } => 1001,
            Self::Network { .. } => 1002,
            Self::HttpStatus { .. } => 1003,
            Self::InvalidResponse { .. } => 1004,
            Self::Configuration { .. } => 1005,
        }
    }
}

//! HTTP transport abstraction.
//!
//! The communicator only needs "send this GET, give me status and body".
//! Keeping that behind [`HttpClient`] lets tests drive the whole
//! request/response flow without a network, and lets hosts plug in their
//! own stack.

use std::time::Duration;

use error_stack::{Report, ResultExt};
use http::Method;

use crate::error::OpenWrapError;

/// Blocking HTTP client used by the communicator.
pub trait HttpClient: Send + Sync {
    /// Sends `request` and returns the full response.
    ///
    /// Non-2xx statuses are returned as responses, not errors; status
    /// validation belongs to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`OpenWrapError::Network`] on connection failures and timeouts.
    fn send(
        &self,
        request: http::Request<()>,
        timeout: Duration,
    ) -> Result<http::Response<Vec<u8>>, Report<OpenWrapError>>;
}

/// [`HttpClient`] backed by a shared `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    #[must_use]
    pub fn new() -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for UreqClient {
    fn send(
        &self,
        request: http::Request<()>,
        timeout: Duration,
    ) -> Result<http::Response<Vec<u8>>, Report<OpenWrapError>> {
        if *request.method() != Method::GET {
            return Err(Report::new(OpenWrapError::InvalidRequest {
                message: format!("Unsupported method {}", request.method()),
            }));
        }

        let uri = request.uri().to_string();
        let mut builder = self.agent.get(&uri);
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }

        log::debug!("Sending GET {} (timeout {:?})", uri, timeout);

        let response = builder
            .config()
            .timeout_global(Some(timeout))
            .build()
            .call()
            .map_err(|e| {
                let message = match &e {
                    ureq::Error::Timeout(_) => format!("request timed out after {:?}", timeout),
                    other => format!("request to {} failed: {}", uri, other),
                };
                Report::new(e).change_context(OpenWrapError::Network { message })
            })?;

        let (parts, mut body) = response.into_parts();
        let bytes = body
            .read_to_vec()
            .change_context(OpenWrapError::Network {
                message: "Failed to read response body".to_string(),
            })?;

        log::debug!("Received HTTP {} ({} bytes)", parts.status, bytes.len());

        Ok(http::Response::from_parts(parts, bytes))
    }
}

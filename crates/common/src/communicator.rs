//! Bridge between the ads loader and the network.
//!
//! A [`Communicator`] owns exactly one [`AdRequest`]. [`Communicator::request_ad`]
//! encodes it, sends it through the [`HttpClient`], validates the status,
//! parses the body into an [`AdResponse`] and reports the outcome to its
//! [`CommunicatorDelegate`]. The lifecycle is one-shot:
//!
//! ```text
//! Idle -> Requesting -> Succeeded
//!                    \-> Failed
//! ```
//!
//! There is no retry, no batching and no cancellation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};

use error_stack::{Report, ResultExt};
use url::Url;

use crate::error::OpenWrapError;
use crate::models::ad_request::AdRequest;
use crate::models::ad_response::AdResponse;
use crate::models::configuration::Configuration;
use crate::transport::HttpClient;
use crate::util::check_for_ok_response;

/// Receives the single outcome of a [`Communicator`].
///
/// Called on the communicator's worker thread.
pub trait CommunicatorDelegate: Send + Sync {
    fn did_receive_ad_response(&self, communicator: &Communicator, response: AdResponse);

    fn did_fail_with_error(&self, communicator: &Communicator, error: Report<OpenWrapError>);
}

/// Lifecycle of a [`Communicator`]. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunicatorState {
    Idle,
    Requesting,
    Succeeded,
    Failed,
}

pub struct Communicator {
    request: AdRequest,
    configuration: Arc<Configuration>,
    endpoint: Url,
    client: Arc<dyn HttpClient>,
    delegate: Mutex<Option<Weak<dyn CommunicatorDelegate>>>,
    state: Mutex<CommunicatorState>,
}

impl Communicator {
    #[must_use]
    pub fn new(
        request: AdRequest,
        configuration: Arc<Configuration>,
        endpoint: Url,
        client: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            request,
            configuration,
            endpoint,
            client,
            delegate: Mutex::new(None),
            state: Mutex::new(CommunicatorState::Idle),
        }
    }

    /// Sets the delegate. Held weakly: a dropped delegate is simply not told.
    pub fn set_delegate(&self, delegate: Weak<dyn CommunicatorDelegate>) {
        *lock(&self.delegate) = Some(delegate);
    }

    #[must_use]
    pub fn request(&self) -> &AdRequest {
        &self.request
    }

    #[must_use]
    pub fn state(&self) -> CommunicatorState {
        *lock(&self.state)
    }

    /// Performs the whole round-trip on the calling thread.
    ///
    /// Does not touch the state machine or the delegate.
    ///
    /// # Errors
    ///
    /// - [`OpenWrapError::InvalidRequest`] if the request cannot be encoded
    /// - [`OpenWrapError::Network`] on transport failure
    /// - [`OpenWrapError::HttpStatus`] for a non-2xx status
    /// - [`OpenWrapError::InvalidResponse`] for an empty or malformed body
    pub fn fetch(&self) -> Result<AdResponse, Report<OpenWrapError>> {
        let http_request = self
            .request
            .to_http_request(&self.configuration, &self.endpoint)?;

        log::info!(
            "Requesting OpenWrap ad for ad unit '{}' ({})",
            self.request.ad_unit_id(),
            self.request.size()
        );

        let response = self
            .client
            .send(http_request, self.request.network_timeout())?;

        let status = response.status();
        let body = response.into_body();
        check_for_ok_response(status, &body)?;

        AdResponse::from_slice(&body).attach(format!(
            "body: {}",
            String::from_utf8_lossy(&body)
                .chars()
                .take(256)
                .collect::<String>()
        ))
    }

    /// Starts the request on a worker thread.
    ///
    /// Returns `None` without doing anything if this communicator already
    /// left the `Idle` state.
    pub fn request_ad(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        {
            let mut state = lock(&self.state);
            if *state != CommunicatorState::Idle {
                log::warn!(
                    "Ignoring request_ad for ad unit '{}': communicator is {:?}",
                    self.request.ad_unit_id(),
                    *state
                );
                return None;
            }
            *state = CommunicatorState::Requesting;
        }

        let communicator = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("openwrap-communicator".to_string())
            .spawn(move || {
                let result = communicator.fetch();
                communicator.complete(result);
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                self.complete(Err(Report::new(e).change_context(OpenWrapError::Network {
                    message: "Failed to start request worker".to_string(),
                })));
                None
            }
        }
    }

    fn complete(&self, result: Result<AdResponse, Report<OpenWrapError>>) {
        *lock(&self.state) = if result.is_ok() {
            CommunicatorState::Succeeded
        } else {
            CommunicatorState::Failed
        };

        let delegate = lock(&self.delegate).as_ref().and_then(Weak::upgrade);
        let Some(delegate) = delegate else {
            log::debug!("Communicator delegate is gone, dropping result");
            return;
        };

        match result {
            Ok(response) => {
                log::info!(
                    "OpenWrap returned {} targeting key(s)",
                    response.targeting_info().len()
                );
                delegate.did_receive_ad_response(self, response);
            }
            Err(error) => {
                log::warn!("OpenWrap request failed: {:?}", error);
                delegate.did_fail_with_error(self, error);
            }
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ad_request::AdSize;
    use crate::test_support::tests::{MockHttpClient, TEST_ENDPOINT};
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    enum Outcome {
        Response(AdResponse),
        Error(i32),
    }

    #[derive(Default)]
    struct RecordingDelegate {
        outcomes: Mutex<Vec<(Outcome, CommunicatorState)>>,
    }

    impl RecordingDelegate {
        fn outcomes(&self) -> Vec<(Outcome, CommunicatorState)> {
            std::mem::take(&mut *self.outcomes.lock().expect("lock poisoned"))
        }
    }

    impl CommunicatorDelegate for RecordingDelegate {
        fn did_receive_ad_response(&self, communicator: &Communicator, response: AdResponse) {
            self.outcomes
                .lock()
                .expect("lock poisoned")
                .push((Outcome::Response(response), communicator.state()));
        }

        fn did_fail_with_error(&self, communicator: &Communicator, error: Report<OpenWrapError>) {
            self.outcomes
                .lock()
                .expect("lock poisoned")
                .push((Outcome::Error(error.current_context().code()), communicator.state()));
        }
    }

    fn communicator(client: Arc<MockHttpClient>) -> Arc<Communicator> {
        let mut request = AdRequest::new("156276", 1165, "video-unit", AdSize::new(640, 480))
            .expect("valid request");
        request.set_network_timeout(Duration::from_secs(2));
        Arc::new(Communicator::new(
            request,
            Arc::new(Configuration::default()),
            Url::parse(TEST_ENDPOINT).expect("valid url"),
            client,
        ))
    }

    fn run(client: MockHttpClient) -> (Arc<Communicator>, Vec<(Outcome, CommunicatorState)>) {
        let communicator = communicator(Arc::new(client));
        let delegate = Arc::new(RecordingDelegate::default());
        let weak = Arc::downgrade(&delegate);
        communicator.set_delegate(weak);

        communicator
            .request_ad()
            .expect("should start")
            .join()
            .expect("worker should not panic");
        let outcomes = delegate.outcomes();
        (communicator, outcomes)
    }

    #[test]
    fn test_success_reports_response() {
        let (communicator, outcomes) = run(MockHttpClient::with_response(
            200,
            r#"{"pwtecp":"2.50","pwtpid":"pubmatic"}"#,
        ));

        assert_eq!(communicator.state(), CommunicatorState::Succeeded);
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            (Outcome::Response(response), state) => {
                assert_eq!(*state, CommunicatorState::Succeeded);
                assert_eq!(response.targeting_info()["pwtecp"], "2.50");
                assert_eq!(response.targeting_info()["pwtpid"], "pubmatic");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_non_2xx_reports_status_error() {
        let (communicator, outcomes) =
            run(MockHttpClient::with_response(500, r#"{"pwtecp":"2.50"}"#));

        assert_eq!(communicator.state(), CommunicatorState::Failed);
        assert_eq!(
            outcomes,
            vec![(Outcome::Error(1003), CommunicatorState::Failed)]
        );
    }

    #[test]
    fn test_malformed_body_reports_invalid_response() {
        let (_, outcomes) = run(MockHttpClient::with_response(200, "<html>"));
        assert_eq!(
            outcomes,
            vec![(Outcome::Error(1004), CommunicatorState::Failed)]
        );
    }

    #[test]
    fn test_network_failure_reports_network_error() {
        let (_, outcomes) = run(MockHttpClient::failing("connection refused"));
        assert_eq!(
            outcomes,
            vec![(Outcome::Error(1002), CommunicatorState::Failed)]
        );
    }

    #[test]
    fn test_request_uses_configured_timeout() {
        let client = Arc::new(MockHttpClient::with_response(200, "{}"));
        let communicator = communicator(Arc::clone(&client));
        communicator.fetch().expect("should fetch");

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].0.starts_with(TEST_ENDPOINT));
        assert_eq!(requests[0].1, Duration::from_secs(2));
    }

    #[test]
    fn test_second_request_is_ignored() {
        let client = Arc::new(MockHttpClient::with_response(200, "{}"));
        let communicator = communicator(Arc::clone(&client));

        let handle = communicator.request_ad().expect("first request starts");
        assert!(communicator.request_ad().is_none());
        handle.join().expect("worker should not panic");
        assert!(communicator.request_ad().is_none());

        assert_eq!(client.requests().len(), 1);
        assert_eq!(communicator.state(), CommunicatorState::Succeeded);
    }

    #[test]
    fn test_dropped_delegate_is_not_called() {
        let communicator = communicator(Arc::new(MockHttpClient::with_response(200, "{}")));
        {
            let delegate = Arc::new(RecordingDelegate::default());
            let weak = Arc::downgrade(&delegate);
            communicator.set_delegate(weak);
        }

        communicator
            .request_ad()
            .expect("should start")
            .join()
            .expect("worker should not panic");
        assert_eq!(communicator.state(), CommunicatorState::Succeeded);
    }
}

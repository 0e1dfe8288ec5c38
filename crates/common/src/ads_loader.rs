//! Entry point used by the host application to load OpenWrap video ads.

use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;

use error_stack::Report;
use url::Url;

use crate::communicator::{lock, Communicator, CommunicatorDelegate};
use crate::error::OpenWrapError;
use crate::models::ad_request::AdRequest;
use crate::models::ad_response::AdResponse;
use crate::models::configuration::Configuration;
use crate::transport::HttpClient;

/// Receives ad load events on behalf of the host application.
pub trait AdsLoaderDelegate: Send + Sync {
    /// The ad was loaded from the OpenWrap server.
    fn did_load_ad(&self, loader: &AdsLoader, response: AdResponse);

    /// Loading or requesting the ad failed.
    fn did_fail_with_error(&self, loader: &AdsLoader, error: Report<OpenWrapError>);
}

/// Loads video ads from the OpenWrap server.
///
/// Each call to [`AdsLoader::request_ads`] gets its own [`Communicator`],
/// which the loader keeps alive until it reports back.
pub struct AdsLoader {
    configuration: Arc<Configuration>,
    endpoint: Url,
    client: Arc<dyn HttpClient>,
    delegate: Mutex<Option<Weak<dyn AdsLoaderDelegate>>>,
    in_flight: Mutex<Vec<Arc<Communicator>>>,
}

impl AdsLoader {
    #[must_use]
    pub fn new(
        configuration: Arc<Configuration>,
        endpoint: Url,
        client: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            configuration,
            endpoint,
            client,
            delegate: Mutex::new(None),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// Sets the delegate notified of load events. Held weakly.
    pub fn set_delegate(&self, delegate: Weak<dyn AdsLoaderDelegate>) {
        *lock(&self.delegate) = Some(delegate);
    }

    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Number of requests that have not reported back yet.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Requests an ad. The outcome arrives on the delegate from a worker
    /// thread; the returned handle can be joined to wait for it.
    pub fn request_ads(self: &Arc<Self>, request: AdRequest) -> Option<JoinHandle<()>> {
        let communicator = Arc::new(Communicator::new(
            request,
            Arc::clone(&self.configuration),
            self.endpoint.clone(),
            Arc::clone(&self.client),
        ));
        let delegate = Arc::downgrade(self);
        communicator.set_delegate(delegate);

        lock(&self.in_flight).push(Arc::clone(&communicator));
        communicator.request_ad()
    }

    fn release(&self, communicator: &Communicator) {
        lock(&self.in_flight).retain(|c| !std::ptr::eq(Arc::as_ptr(c), communicator));
    }

    fn loader_delegate(&self) -> Option<Arc<dyn AdsLoaderDelegate>> {
        lock(&self.delegate).as_ref().and_then(Weak::upgrade)
    }
}

impl CommunicatorDelegate for AdsLoader {
    fn did_receive_ad_response(&self, communicator: &Communicator, response: AdResponse) {
        self.release(communicator);
        match self.loader_delegate() {
            Some(delegate) => delegate.did_load_ad(self, response),
            None => log::debug!("Ads loader delegate is gone, dropping loaded ad"),
        }
    }

    fn did_fail_with_error(&self, communicator: &Communicator, error: Report<OpenWrapError>) {
        self.release(communicator);
        match self.loader_delegate() {
            Some(delegate) => delegate.did_fail_with_error(self, error),
            None => log::debug!("Ads loader delegate is gone, dropping error: {}", error),
        }
    }
}

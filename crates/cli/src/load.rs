//! Ad loading commands.
//!
//! `load` plays the part of a video host application: it asks OpenWrap for
//! targeting through an [`AdsLoader`] and turns the result into the DFP ad
//! tag the IMA player would be given.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use clap::Args;
use error_stack::Report;
use openwrap_common::ad_tag::AdTagBuilder;
use openwrap_common::ads_loader::{AdsLoader, AdsLoaderDelegate};
use openwrap_common::error::OpenWrapError;
use openwrap_common::models::ad_request::{AdRequest, AdSize};
use openwrap_common::models::ad_response::AdResponse;
use openwrap_common::models::configuration::Configuration;
use openwrap_common::settings::Settings;
use openwrap_common::transport::{HttpClient, UreqClient};
use url::Url;

use crate::config::load_settings;
use crate::error::CliError;
use crate::OutputFormat;

/// Arguments shared by `load` and `url`.
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Path to the TOML configuration file (bundled defaults if omitted)
    #[arg(long, short, env = "OPENWRAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Publisher id
    #[arg(long)]
    pub pub_id: String,

    /// OpenWrap profile id
    #[arg(long)]
    pub profile_id: u32,

    /// Ad unit id, shared with DFP
    #[arg(long)]
    pub ad_unit: String,

    /// Video size as WIDTHxHEIGHT
    #[arg(long, default_value = "640x480")]
    pub size: String,

    /// Profile version, for profiles in draft or staging
    #[arg(long)]
    pub version_id: Option<u32>,

    /// Ask the server for debug output
    #[arg(long)]
    pub debug: bool,

    /// Network timeout in seconds (settings default if omitted)
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Builds the ad request described by `args`.
pub(crate) fn build_request(args: &RequestArgs, settings: &Settings) -> Result<AdRequest, CliError> {
    let size: AdSize = args
        .size
        .parse()
        .map_err(|e: Report<OpenWrapError>| CliError::Usage(e.current_context().to_string()))?;

    let mut request = AdRequest::new(&args.pub_id, args.profile_id, &args.ad_unit, size)
        .map_err(|e| CliError::Usage(e.current_context().to_string()))?;
    request.version_id = args.version_id;
    request.debug = args.debug;

    let timeout_secs = args
        .timeout
        .unwrap_or(settings.openwrap.default_timeout_secs);
    request.set_network_timeout(Duration::from_secs(timeout_secs));

    Ok(request)
}

/// Print the OpenWrap request URL without sending it.
pub fn print_url(args: RequestArgs, verbose: bool) -> Result<(), CliError> {
    let settings = load_settings(args.config.as_deref(), verbose)?;
    let request = build_request(&args, &settings)?;
    let config = settings.to_configuration();

    let http_request = request.to_http_request(&config, &settings.endpoint_url()?)?;
    println!("{}", http_request.uri());

    Ok(())
}

type Outcome = Result<AdResponse, Report<OpenWrapError>>;

/// Host side of the loader: remembers what the loader reported.
#[derive(Default)]
pub(crate) struct HostDelegate {
    outcome: Mutex<Option<Outcome>>,
}

impl HostDelegate {
    pub(crate) fn take_outcome(&self) -> Option<Outcome> {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn record(&self, outcome: Outcome) {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
    }
}

impl AdsLoaderDelegate for HostDelegate {
    fn did_load_ad(&self, _loader: &AdsLoader, response: AdResponse) {
        log::debug!("Host received ad response");
        self.record(Ok(response));
    }

    fn did_fail_with_error(&self, _loader: &AdsLoader, error: Report<OpenWrapError>) {
        log::debug!("Host received error {}", error.current_context().code());
        self.record(Err(error));
    }
}

/// Runs one request through an [`AdsLoader`] and waits for the delegate.
pub(crate) fn load_ad(
    configuration: Arc<Configuration>,
    endpoint: Url,
    client: Arc<dyn HttpClient>,
    request: AdRequest,
) -> Result<AdResponse, CliError> {
    let loader = Arc::new(AdsLoader::new(configuration, endpoint, client));
    let host = Arc::new(HostDelegate::default());
    let delegate = Arc::downgrade(&host);
    loader.set_delegate(delegate);

    let handle = loader
        .request_ads(request)
        .ok_or_else(|| CliError::Usage("Ad request was not started".to_string()))?;
    handle
        .join()
        .map_err(|_| CliError::Usage("Ad request worker panicked".to_string()))?;

    match host.take_outcome() {
        Some(Ok(response)) => Ok(response),
        Some(Err(report)) => Err(CliError::from(report)),
        None => Err(CliError::Usage(
            "Ad loader finished without reporting".to_string(),
        )),
    }
}

/// Renders the targeting and the ad tag URL for stdout.
pub(crate) fn render(
    response: &AdResponse,
    ad_tag_url: &Url,
    format: &OutputFormat,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            if response.is_empty() {
                out.push_str("No targeting returned\n");
            } else {
                out.push_str("Targeting:\n");
                for (key, value) in response.targeting_info() {
                    out.push_str(&format!("  {} = {}\n", key, value));
                }
            }
            out.push_str(&format!("Ad tag URL: {}", ad_tag_url));
            Ok(out)
        }
        OutputFormat::Json => {
            let targeting: &BTreeMap<String, String> = response.targeting_info();
            let value = serde_json::json!({
                "targeting": targeting,
                "ad_tag_url": ad_tag_url.as_str(),
            });
            serde_json::to_string_pretty(&value)
                .map_err(|e| CliError::Usage(format!("Failed to render JSON: {}", e)))
        }
    }
}

/// Load an ad from OpenWrap and print the IMA ad tag URL.
pub fn load(args: RequestArgs, format: OutputFormat, verbose: bool) -> Result<(), CliError> {
    let settings = load_settings(args.config.as_deref(), verbose)?;
    let request = build_request(&args, &settings)?;
    let configuration = Arc::new(settings.to_configuration());
    let endpoint = settings.endpoint_url()?;
    let ad_tag_builder = AdTagBuilder::new(settings.ad_tag_base_url()?);

    log::debug!("Using OpenWrap endpoint {}", endpoint);

    let client: Arc<dyn HttpClient> = Arc::new(UreqClient::new());
    let response = load_ad(
        Arc::clone(&configuration),
        endpoint,
        client,
        request.clone(),
    )?;

    let ad_tag_url = ad_tag_builder.build(&request, Some(&response), &configuration);
    println!("{}", render(&response, &ad_tag_url, &format)?);

    Ok(())
}

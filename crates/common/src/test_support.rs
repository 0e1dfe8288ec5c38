#[cfg(any(test, feature = "test-support"))]
pub mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use error_stack::Report;
    use http::StatusCode;

    use crate::error::OpenWrapError;
    use crate::settings::Settings;
    use crate::transport::HttpClient;

    pub const TEST_ENDPOINT: &str = "https://ow.test-pubmatic.com/openrtb/2.5/video";

    pub fn crate_test_settings_str() -> String {
        r#"
            [openwrap]
            endpoint = "https://ow.test-pubmatic.com/openrtb/2.5/video"
            default_timeout_secs = 5

            [ad_tag]
            base_url = "https://pubads.g.doubleclick.net/gampad/ads"

            [consent]
            gdpr_enabled = true
            gdpr_consent = "BOEFEAyOEFEAyAHABDENAI4AAAB9vABAASA"
            ccpa = "1YNN"

            [device]
            advertising_id = "E621E1F8-C36C-495A-93FC-0C247A3E6E5F"
            hash = "md5"
            linearity = "linear"

            [app]
            app_id = "1175273098"
            name = "OpenWrap IMA Sample"
            store_url = "https://itunes.apple.com/us/app/id1175273098?mt=8"
            categories = "IAB-1,IAB-2"
            paid = false

            [user]
            birth_year = 1988
            gender = "female"
            country = "USA"

            [custom_key_values]
            genre = "sports"
            tags = ["live", "hd"]
            "#
        .to_string()
    }

    pub fn create_test_settings() -> Settings {
        let toml_str = crate_test_settings_str();
        Settings::from_toml(&toml_str).expect("Invalid config")
    }

    enum MockReply {
        Response(StatusCode, Vec<u8>),
        NetworkError(String),
    }

    /// [`HttpClient`] that records requests and answers with a canned reply.
    pub struct MockHttpClient {
        reply: MockReply,
        requests: Mutex<Vec<(String, Duration)>>,
    }

    impl MockHttpClient {
        pub fn with_response(status: u16, body: &str) -> Self {
            Self {
                reply: MockReply::Response(
                    StatusCode::from_u16(status).expect("valid status"),
                    body.as_bytes().to_vec(),
                ),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: MockReply::NetworkError(message.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// URIs and timeouts of every request sent so far.
        pub fn requests(&self) -> Vec<(String, Duration)> {
            self.requests.lock().expect("lock poisoned").clone()
        }
    }

    impl HttpClient for MockHttpClient {
        fn send(
            &self,
            request: http::Request<()>,
            timeout: Duration,
        ) -> Result<http::Response<Vec<u8>>, Report<OpenWrapError>> {
            self.requests
                .lock()
                .expect("lock poisoned")
                .push((request.uri().to_string(), timeout));

            match &self.reply {
                MockReply::Response(status, body) => Ok(http::Response::builder()
                    .status(*status)
                    .body(body.clone())
                    .expect("valid response")),
                MockReply::NetworkError(message) => Err(Report::new(OpenWrapError::Network {
                    message: message.clone(),
                })),
            }
        }
    }
}

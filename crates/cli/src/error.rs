//! CLI error types.

use std::fmt;

use error_stack::Report;
use openwrap_common::error::OpenWrapError;

#[derive(Debug)]
pub enum CliError {
    /// Configuration file error
    Config(String),
    /// Invalid command line arguments
    Usage(String),
    /// The ad request failed
    Ad { code: i32, message: String },
    /// IO error
    Io(std::io::Error),
    /// TOML parsing error
    Toml(toml::de::Error),
    /// Logger setup error
    Logging(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Usage(msg) => write!(f, "Usage error: {}", msg),
            CliError::Ad { code, message } => write!(f, "Ad error {}: {}", code, message),
            CliError::Io(err) => write!(f, "IO error: {}", err),
            CliError::Toml(err) => write!(f, "TOML error: {}", err),
            CliError::Logging(msg) => write!(f, "Logging error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(err) => Some(err),
            CliError::Toml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Toml(err)
    }
}

impl From<Report<OpenWrapError>> for CliError {
    fn from(report: Report<OpenWrapError>) -> Self {
        let context = report.current_context();
        match context {
            OpenWrapError::Configuration { .. } => CliError::Config(format!("{:?}", report)),
            other => CliError::Ad {
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_cli_error_display() {
        assert_eq!(
            format!("{}", CliError::Config("test".into())),
            "Configuration error: test"
        );
        assert_eq!(
            format!("{}", CliError::Usage("test".into())),
            "Usage error: test"
        );
        assert_eq!(
            format!(
                "{}",
                CliError::Ad {
                    code: 1003,
                    message: "Ad server returned HTTP 500".into()
                }
            ),
            "Ad error 1003: Ad server returned HTTP 500"
        );
    }

    #[test]
    fn test_cli_error_from_report() {
        let report = Report::new(OpenWrapError::HttpStatus { status: 502 });
        match CliError::from(report) {
            CliError::Ad { code, message } => {
                assert_eq!(code, 1003);
                assert_eq!(message, "Ad server returned HTTP 502");
            }
            other => panic!("Expected Ad variant, got {:?}", other),
        }

        let report = Report::new(OpenWrapError::Configuration {
            message: "bad".into(),
        });
        assert!(matches!(CliError::from(report), CliError::Config(_)));
    }

    #[test]
    fn test_cli_error_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.source().is_some());

        let config_err = CliError::Config("test".into());
        assert!(config_err.source().is_none());
    }
}

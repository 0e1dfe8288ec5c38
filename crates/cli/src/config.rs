//! Configuration loading and validation.
//!
//! Settings are loaded from TOML and merged with environment variables
//! prefixed with `OPENWRAP__`. For example, `OPENWRAP__CONSENT__CCPA=1YNN`
//! overrides `consent.ccpa` in the TOML file.

use std::fs;
use std::path::{Path, PathBuf};

use openwrap_common::settings::{Settings, ENVIRONMENT_VARIABLE_PREFIX};

use crate::error::CliError;

/// Loads settings from `file`, or the bundled defaults when no file is given.
pub(crate) fn load_settings(file: Option<&Path>, verbose: bool) -> Result<Settings, CliError> {
    let Some(file) = file else {
        log::debug!("No config file given, using bundled settings");
        return Settings::new().map_err(CliError::from);
    };

    let content = fs::read_to_string(file)?;

    if verbose {
        println!("Loading config from: {}", file.display());
        println!(
            "Environment variables with {}__ prefix will be merged",
            ENVIRONMENT_VARIABLE_PREFIX
        );
    }

    Settings::from_toml(&content)
        .map_err(|e| CliError::Config(format!("Failed to parse and merge config: {:?}", e)))
}

/// Validate configuration file.
///
/// Checks TOML syntax, required fields and value ranges after merging
/// environment overrides.
pub fn validate(file: PathBuf, verbose: bool) -> Result<(), CliError> {
    let settings = load_settings(Some(&file), verbose)?;

    // URLs pass the validator but still have to parse for the request path.
    settings.endpoint_url()?;
    settings.ad_tag_base_url()?;

    println!("Configuration is valid");
    println!("  File: {}", file.display());
    println!("  Hash: {}", settings.fingerprint()?);
    println!("  Endpoint: {}", settings.openwrap.endpoint);
    println!(
        "  Default timeout: {}s",
        settings.openwrap.default_timeout_secs
    );

    if verbose {
        let merged_toml = settings.to_canonical_toml()?;
        let value: toml::Value = toml::from_str(&merged_toml)?;
        if let Some(table) = value.as_table() {
            println!("\nSections found:");
            for key in table.keys() {
                println!("  - [{}]", key);
            }
        }

        println!("\nCustom key-values:");
        if settings.custom_key_values.is_empty() {
            println!("  (none)");
        }
        for key in settings.custom_key_values.keys() {
            println!("  - {}", key);
        }
    }

    Ok(())
}

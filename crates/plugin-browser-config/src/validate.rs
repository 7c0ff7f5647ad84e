//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Longest accepted request timeout.
const MAX_TIMEOUT_SECS: u64 = 600;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_manifest(config)?;
    validate_plugins(config)?;
    validate_logging(config)?;
    Ok(())
}

/// Check that `url` is an absolute `http`/`https` URL.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] for `field` otherwise.
pub fn validate_http_url(field: &str, url: &str) -> ConfigResult<()> {
    let invalid = |message: String| ConfigError::ValidationError {
        field: field.to_owned(),
        message,
    };
    let parsed = url::Url::parse(url.trim()).map_err(|e| invalid(format!("'{url}' is not a valid URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "URL must use http or https, not '{}'",
            parsed.scheme()
        )));
    }
    Ok(())
}

fn validate_manifest(config: &Config) -> ConfigResult<()> {
    let m = &config.manifest;
    validate_http_url("manifest.url", &m.url)?;

    if m.timeout_secs == 0 || m.timeout_secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::ValidationError {
            field: "manifest.timeout_secs".to_owned(),
            message: format!("timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds"),
        });
    }

    if m.max_manifest_bytes == 0 {
        return Err(ConfigError::ValidationError {
            field: "manifest.max_manifest_bytes".to_owned(),
            message: "must be greater than zero".to_owned(),
        });
    }
    Ok(())
}

fn validate_plugins(config: &Config) -> ConfigResult<()> {
    let p = &config.plugins;

    if p.root.as_ref().is_some_and(|r| r.as_os_str().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: "plugins.root".to_owned(),
            message: "must not be empty; omit the key to use the default location".to_owned(),
        });
    }

    for (field, value) in [
        ("plugins.max_download_bytes", p.max_download_bytes),
        ("plugins.max_extracted_bytes", p.max_extracted_bytes),
    ] {
        if value == 0 {
            return Err(ConfigError::ValidationError {
                field: field.to_owned(),
                message: "must be greater than zero".to_owned(),
            });
        }
    }

    if p.max_archive_entries == 0 {
        return Err(ConfigError::ValidationError {
            field: "plugins.max_archive_entries".to_owned(),
            message: "must be greater than zero".to_owned(),
        });
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        });
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json") {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported format '{}'; expected one of: pretty, compact, json",
                l.format
            ),
        });
    }
    Ok(())
}

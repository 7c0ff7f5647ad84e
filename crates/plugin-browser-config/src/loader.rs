//! Config file discovery and layered loading.
//!
//! Implements the `load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge the user file (`<config dir>/config.toml` or an explicit path)
//! 3. Apply env var fallbacks for fields the user file left unset
//! 4. Deserialize merged tree → `Config`
//! 5. Validate
//! 6. Return `ResolvedConfig`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::show::ResolvedConfig;
use crate::types::{Config, DEFAULT_MANIFEST_URL};
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Name of the user config file inside the config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// The per-user config file location, e.g.
/// `~/.config/plugin-browser/config.toml` on Linux.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDir`] if the platform config directory
/// cannot be determined.
pub fn user_config_path() -> ConfigResult<PathBuf> {
    directories::ProjectDirs::from("", "", "plugin-browser")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoHomeDir)
}

/// Load the configuration from the process environment.
///
/// `config_override` replaces the default user file location.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the user file is malformed, or if the final
/// merged configuration fails validation.
pub fn load(config_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let path = match config_override {
        Some(path) => path.to_path_buf(),
        None => user_config_path()?,
    };
    load_with_env(&path, &collect_env_vars())
}

/// Load the configuration from `user_path` with an explicit env snapshot.
///
/// A missing user file is not an error; defaults and env fallbacks apply.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the user file is malformed, or if the final
/// merged configuration fails validation.
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    user_path: &Path,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    // 1. Parse embedded defaults.
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", ConfigLayer::Defaults, &mut field_sources);

    // 2. User config.
    if let Some(overlay) = try_load_file(user_path)? {
        deep_merge_tracking(&mut merged, &overlay, "", ConfigLayer::User, &mut field_sources);
        loaded_files.push(user_path.display().to_string());
        info!(path = %user_path.display(), "loaded user config");
    }

    // 3. Env var fallbacks for unset fields.
    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    // 4. Deserialize.
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    // 5. Validate.
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        fallback_manifest_url: fallback_manifest_url(env_vars),
        config,
        field_sources,
        loaded_files,
        user_config_path: user_path.to_path_buf(),
    })
}

/// The manifest URL in effect when the user file does not set one: the env
/// fallback if it is a usable URL, otherwise the built-in default.
fn fallback_manifest_url<S: ::std::hash::BuildHasher>(env_vars: &HashMap<String, String, S>) -> String {
    let Some(env_url) = env_vars
        .get("PLUGIN_BROWSER_MANIFEST_URL")
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
    else {
        return DEFAULT_MANIFEST_URL.to_owned();
    };

    match validate::validate_http_url("manifest.url", env_url) {
        Ok(()) => env_url.to_owned(),
        Err(e) => {
            warn!(error = %e, "ignoring PLUGIN_BROWSER_MANIFEST_URL");
            DEFAULT_MANIFEST_URL.to_owned()
        },
    }
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read operation (no separate exists/metadata checks).
pub(crate) fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

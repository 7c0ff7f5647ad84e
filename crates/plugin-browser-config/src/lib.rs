//! Plugin Browser Config - Layered configuration and persisted settings.
//!
//! Configuration is assembled from three layers, highest precedence first:
//!
//! 1. The user config file (`<config dir>/plugin-browser/config.toml`, or an
//!    explicit path)
//! 2. `PLUGIN_BROWSER_*` environment variables, for fields the file leaves
//!    unset
//! 3. Embedded defaults
//!
//! [`ResolvedConfig`] remembers which layer set each field, for
//! `config show`. [`SettingsFile`] rewrites the manifest URL in the user
//! file without disturbing its other keys.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod env;
mod error;
mod loader;
mod merge;
mod settings;
mod show;
mod types;
mod validate;

pub use env::{collect_env_vars, env_var_for};
pub use error::{ConfigError, ConfigResult};
pub use loader::{load, load_with_env, user_config_path};
pub use merge::{ConfigLayer, FieldSources};
pub use settings::SettingsFile;
pub use show::{ResolvedConfig, ShowFormat};
pub use types::{
    Config, DEFAULT_MANIFEST_URL, LoggingSection, ManifestSection, PluginsSection,
    default_plugin_root,
};
pub use validate::{validate, validate_http_url};

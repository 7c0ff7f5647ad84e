//! CLI commands.
//!
//! Core failures are already on screen via the status stream by the time a
//! command sees them, so commands turn them into an exit code rather than
//! an `anyhow` error.

pub(crate) mod catalog;
pub(crate) mod config;
pub(crate) mod manage;

use plugin_browser_core::AvailablePlugin;
use plugin_browser_core::manifest::find_plugin;

/// Find a catalog entry by id, exactly first, then ignoring ASCII case.
pub(crate) fn find_available<'a>(plugins: &'a [AvailablePlugin], id: &str) -> Option<&'a AvailablePlugin> {
    find_plugin(plugins, id).or_else(|| plugins.iter().find(|p| p.id.eq_ignore_ascii_case(id)))
}

//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only apply to fields the
//! user's config file did not set.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported `PLUGIN_BROWSER_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "PLUGIN_BROWSER_MANIFEST_URL",
        field_path: "manifest.url",
    },
    EnvMapping {
        var_name: "PLUGIN_BROWSER_PLUGIN_DIR",
        field_path: "plugins.root",
    },
    EnvMapping {
        var_name: "PLUGIN_BROWSER_LOG",
        field_path: "logging.level",
    },
];

/// Prefix shared by every recognised env var.
const ENV_PREFIX: &str = "PLUGIN_BROWSER_";

/// Snapshot the process environment, keeping only `PLUGIN_BROWSER_*` vars.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().filter(|(k, _)| k.starts_with(ENV_PREFIX)).collect()
}

/// The env var that backs `field_path`, if any.
#[must_use]
pub fn env_var_for(field_path: &str) -> Option<&'static str> {
    ENV_MAPPINGS
        .iter()
        .find(|m| m.field_path == field_path)
        .map(|m| m.var_name)
}

/// Apply environment variable fallbacks to fields that no config file set.
///
/// Empty values are ignored. Returns the number of env vars applied.
pub(crate) fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if sources.get(mapping.field_path) == Some(&ConfigLayer::User) {
            continue;
        }

        let Some(val) = env_vars.get(mapping.var_name).filter(|v| !v.trim().is_empty()) else {
            continue;
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_field(merged, mapping.field_path, toml::Value::String(val.trim().to_owned()));
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }

    count
}

/// Set a dotted field in the TOML tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

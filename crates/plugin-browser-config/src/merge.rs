//! Deep merge of TOML values with per-field source tracking.
//!
//! The merge operates on raw [`toml::Value`] trees rather than deserialized
//! structs, so a key missing from the user file never overrides a default.

use std::collections::HashMap;

/// Which configuration layer a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// The user's config file.
    User,
    /// Environment variable fallback.
    Environment,
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::User => write!(f, "user"),
            Self::Environment => write!(f, "env"),
        }
    }
}

/// Tracks which layer set each field's value.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Deep-merge `overlay` into `base`, recording `layer` for every leaf the
/// overlay sets. `prefix` is the dotted path of `base` (empty at the root).
pub(crate) fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join_path(prefix, key);
                match base_table.get_mut(key) {
                    Some(base_val) if overlay_val.is_table() => {
                        deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                    },
                    Some(base_val) => {
                        *base_val = overlay_val.clone();
                        sources.insert(path, layer);
                    },
                    None => {
                        record_leaves(overlay_val, &path, layer, sources);
                        base_table.insert(key.clone(), overlay_val.clone());
                    },
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            sources.insert(prefix.to_owned(), layer);
        },
    }
}

/// Mark every leaf under `val` as coming from `layer`.
pub(crate) fn record_leaves(val: &toml::Value, prefix: &str, layer: ConfigLayer, sources: &mut FieldSources) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_leaves(child, &join_path(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer);
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

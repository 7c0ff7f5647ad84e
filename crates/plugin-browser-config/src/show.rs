//! Source-annotated display for `config show`.
//!
//! Prints the resolved configuration with annotations showing which layer
//! (defaults, user, environment) set each value.

use std::fmt::{self, Write as _};
use std::path::PathBuf;

use crate::merge::FieldSources;
use crate::types::Config;

/// A resolved configuration together with source annotations.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Config,
    /// Dotted field path → which layer set the value.
    pub field_sources: FieldSources,
    /// Config file paths that were loaded (in precedence order).
    pub loaded_files: Vec<String>,
    /// Where the user config file lives (whether or not it exists).
    pub user_config_path: PathBuf,
    /// Manifest URL used when the user file does not set one.
    pub fallback_manifest_url: String,
}

/// Output format for `config show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    /// TOML with inline comments showing source.
    Toml,
    /// JSON (for programmatic consumption).
    Json,
}

impl ResolvedConfig {
    /// Format the resolved config, optionally restricted to one section.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or `section` does not exist.
    pub fn show(&self, format: ShowFormat, section: Option<&str>) -> Result<String, fmt::Error> {
        match format {
            ShowFormat::Toml => self.show_toml(section),
            ShowFormat::Json => self.show_json(section),
        }
    }

    fn section_value(&self, section_name: &str) -> Result<toml::Value, fmt::Error> {
        let val = toml::Value::try_from(&self.config).map_err(|_| fmt::Error)?;
        let table = val.as_table().ok_or(fmt::Error)?;
        table.get(section_name).cloned().ok_or(fmt::Error)
    }

    fn show_toml(&self, section: Option<&str>) -> Result<String, fmt::Error> {
        let toml_str = if let Some(section_name) = section {
            toml::to_string_pretty(&self.section_value(section_name)?).map_err(|_| fmt::Error)?
        } else {
            toml::to_string_pretty(&self.config).map_err(|_| fmt::Error)?
        };

        let mut output = String::new();

        output.push_str("# Resolved Plugin Browser Configuration\n");
        output.push_str("# Source annotations: [defaults] [user] [env]\n");
        writeln!(output, "# User config file: {}", self.user_config_path.display())?;

        if !self.loaded_files.is_empty() {
            output.push_str("#\n# Loaded files (in precedence order):\n");
            for (i, path) in self.loaded_files.iter().enumerate() {
                writeln!(output, "#   {}. {path}", i.saturating_add(1))?;
            }
        }

        output.push('\n');

        let mut current_section = section.unwrap_or("").to_owned();
        for line in toml_str.lines() {
            if let Some(header) = section_header(line) {
                current_section = header.to_owned();
            }
            if let Some(annotation) = self.annotate_line(line, &current_section) {
                writeln!(output, "{line}  # {annotation}")?;
            } else {
                output.push_str(line);
                output.push('\n');
            }
        }

        Ok(output)
    }

    fn show_json(&self, section: Option<&str>) -> Result<String, fmt::Error> {
        if let Some(section_name) = section {
            serde_json::to_string_pretty(&self.section_value(section_name)?).map_err(|_| fmt::Error)
        } else {
            serde_json::to_string_pretty(&self.config).map_err(|_| fmt::Error)
        }
    }

    /// Try to extract a source annotation for a TOML line.
    fn annotate_line(&self, line: &str, prefix: &str) -> Option<String> {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }

        let key = trimmed.split('=').next()?.trim();
        let field_path = if prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{prefix}.{key}")
        };

        self.field_sources
            .get(&field_path)
            .map(|layer| format!("[{layer}]"))
    }
}

/// `manifest` for a `[manifest]` line.
fn section_header(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .filter(|name| !name.starts_with('['))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::ConfigLayer;

    fn resolved() -> ResolvedConfig {
        let mut field_sources = FieldSources::new();
        field_sources.insert("manifest.url".to_owned(), ConfigLayer::User);
        field_sources.insert("manifest.timeout_secs".to_owned(), ConfigLayer::Defaults);
        field_sources.insert("logging.level".to_owned(), ConfigLayer::Environment);

        ResolvedConfig {
            config: Config::default(),
            field_sources,
            loaded_files: vec!["/home/cmdr/.config/plugin-browser/config.toml".to_owned()],
            user_config_path: PathBuf::from("/home/cmdr/.config/plugin-browser/config.toml"),
            fallback_manifest_url: crate::types::DEFAULT_MANIFEST_URL.to_owned(),
        }
    }

    #[test]
    fn test_show_toml_annotates_each_section() {
        let output = resolved().show(ShowFormat::Toml, None).unwrap();

        assert!(output.starts_with("# Resolved Plugin Browser Configuration"));
        assert!(output.contains("#   1. /home/cmdr/.config/plugin-browser/config.toml"));
        assert!(output.lines().any(|l| l.starts_with("url =") && l.ends_with("# [user]")));
        assert!(output.lines().any(|l| l.starts_with("timeout_secs =") && l.ends_with("# [defaults]")));
        assert!(output.lines().any(|l| l.starts_with("level =") && l.ends_with("# [env]")));
    }

    #[test]
    fn test_show_single_section() {
        let output = resolved().show(ShowFormat::Toml, Some("logging")).unwrap();
        assert!(output.lines().any(|l| l.starts_with("level =") && l.ends_with("# [env]")));
        assert!(!output.contains("timeout_secs"));
    }

    #[test]
    fn test_show_json_parses() {
        let output = resolved().show(ShowFormat::Json, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["manifest"]["timeout_secs"], 15);
    }

    #[test]
    fn test_unknown_section_is_an_error() {
        assert!(resolved().show(ShowFormat::Json, Some("nope")).is_err());
    }

    #[test]
    fn test_section_header() {
        assert_eq!(section_header("[plugins]"), Some("plugins"));
        assert_eq!(section_header("[[plugins]]"), None);
        assert_eq!(section_header("url = \"x\""), None);
    }
}

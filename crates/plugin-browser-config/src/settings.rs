//! Persisted user settings.
//!
//! The manifest URL is the only setting the browser changes at runtime. It
//! lives in the user config file under `manifest.url`; every other key in
//! that file is preserved when it is rewritten.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::loader::try_load_file;
use crate::show::ResolvedConfig;
use crate::validate::validate_http_url;

/// Read/write access to the manifest URL in the user config file.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
    fallback_url: String,
}

impl SettingsFile {
    /// A settings file at `path`, falling back to `fallback_url` when the
    /// file does not set a manifest URL.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, fallback_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            fallback_url: fallback_url.into(),
        }
    }

    /// The settings file backing `resolved`.
    #[must_use]
    pub fn from_resolved(resolved: &ResolvedConfig) -> Self {
        Self::new(
            resolved.user_config_path.clone(),
            resolved.fallback_manifest_url.clone(),
        )
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current manifest URL.
    ///
    /// Re-reads the file on every call. An unreadable file or a missing or
    /// invalid `manifest.url` yields the fallback URL.
    #[must_use]
    pub fn manifest_url(&self) -> String {
        match self.stored_url() {
            Ok(Some(url)) => url,
            Ok(None) => self.fallback_url.clone(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "using fallback manifest URL");
                self.fallback_url.clone()
            },
        }
    }

    fn stored_url(&self) -> ConfigResult<Option<String>> {
        let Some(doc) = try_load_file(&self.path)? else {
            return Ok(None);
        };
        let Some(url) = doc
            .get("manifest")
            .and_then(|m| m.get("url"))
            .and_then(toml::Value::as_str)
        else {
            return Ok(None);
        };
        validate_http_url("manifest.url", url)?;
        Ok(Some(url.trim().to_owned()))
    }

    /// Persist a new manifest URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if `url` is not an absolute
    /// `http`/`https` URL, or a read/parse/write error for the file. The file
    /// is untouched on error.
    pub fn set_manifest_url(&self, url: &str) -> ConfigResult<()> {
        validate_http_url("manifest.url", url)?;
        let url = url.trim();

        let mut doc = self.load_document()?;
        let root = doc.as_table_mut().ok_or_else(|| self.not_a_table())?;
        let manifest = root
            .entry("manifest")
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()))
            .as_table_mut()
            .ok_or_else(|| ConfigError::ValidationError {
                field: "manifest".to_owned(),
                message: "expected a table".to_owned(),
            })?;
        manifest.insert("url".to_owned(), toml::Value::String(url.to_owned()));

        self.write_document(&doc)?;
        info!(path = %self.path.display(), url, "saved manifest URL");
        Ok(())
    }

    /// Remove the stored manifest URL so the fallback applies again.
    ///
    /// # Errors
    ///
    /// Returns a read/parse/write error for the file. A missing file is not
    /// an error.
    pub fn reset_manifest_url(&self) -> ConfigResult<()> {
        let Some(mut doc) = try_load_file(&self.path)? else {
            return Ok(());
        };
        let root = doc.as_table_mut().ok_or_else(|| self.not_a_table())?;

        let Some(manifest) = root.get_mut("manifest").and_then(toml::Value::as_table_mut) else {
            return Ok(());
        };
        if manifest.remove("url").is_none() {
            return Ok(());
        }
        if manifest.is_empty() {
            root.remove("manifest");
        }

        self.write_document(&doc)?;
        info!(path = %self.path.display(), "reset manifest URL");
        Ok(())
    }

    fn load_document(&self) -> ConfigResult<toml::Value> {
        Ok(try_load_file(&self.path)?.unwrap_or_else(|| toml::Value::Table(toml::map::Map::new())))
    }

    fn not_a_table(&self) -> ConfigError {
        ConfigError::ValidationError {
            field: self.path.display().to_string(),
            message: "config file is not a table".to_owned(),
        }
    }

    /// Replace the file atomically: write a sibling temp file, sync, rename.
    fn write_document(&self, doc: &toml::Value) -> ConfigResult<()> {
        let write_err = |source: std::io::Error| ConfigError::WriteError {
            path: self.path.display().to_string(),
            source,
        };

        let content = toml::to_string_pretty(doc).map_err(|e| {
            write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(write_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

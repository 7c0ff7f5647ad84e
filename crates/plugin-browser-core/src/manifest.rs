//! Remote plugin catalog: schema, validation and fetching.
//!
//! The manifest is untrusted input. It is decoded into a fixed schema
//! ([`ManifestRecord`], unknown keys rejected) and then validated as a whole:
//! every id must be a safe folder name and unique within the manifest. A
//! single bad record rejects the entire manifest; nothing is partially
//! ingested.
//!
//! # Format
//!
//! ```json
//! [
//!   {
//!     "id": "foo",
//!     "name": "Foo",
//!     "version": "1.2.0",
//!     "author": "Someone",
//!     "description": "Does foo things",
//!     "downloadUrl": "https://example.com/foo.zip",
//!     "edmcCompatibility": ">=5.0",
//!     "repositoryUrl": "https://github.com/someone/foo"
//!   }
//! ]
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{PluginBrowserError, PluginBrowserResult};
use crate::naming::{DISABLED_SUFFIX, validate_folder_name};
use crate::transport::{Transport, fetch_cancellable};

/// Maximum manifest body size (5 MiB).
pub const DEFAULT_MAX_MANIFEST_BYTES: u64 = 5 * 1024 * 1024;

/// A plugin offered by the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailablePlugin {
    /// Stable machine key; also the folder name the plugin installs into.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Author as given by the catalog.
    pub author: String,
    /// Version string. Ordering is best-effort only.
    pub version: String,
    /// One-paragraph description.
    pub description: String,
    /// Absolute `http`/`https` URL of the zip archive.
    pub download_url: String,
    /// Advisory host-compatibility constraint.
    pub compatibility: Option<String>,
    /// Project homepage or source repository.
    pub repository_url: Option<String>,
}

/// One record exactly as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ManifestRecord {
    /// Plugin id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// Author.
    pub author: String,
    /// Description.
    pub description: String,
    /// Archive location.
    pub download_url: String,
    /// Host compatibility constraint.
    #[serde(default)]
    pub edmc_compatibility: Option<String>,
    /// Source repository.
    #[serde(default)]
    pub repository_url: Option<String>,
}

impl TryFrom<ManifestRecord> for AvailablePlugin {
    type Error = PluginBrowserError;

    fn try_from(record: ManifestRecord) -> PluginBrowserResult<Self> {
        let id = record.id.trim().to_string();
        if id.is_empty() {
            return Err(PluginBrowserError::manifest("plugin id must not be empty"));
        }
        validate_folder_name(&id)
            .map_err(|e| PluginBrowserError::manifest(format!("plugin '{id}': {e}")))?;
        if id.ends_with(DISABLED_SUFFIX) {
            return Err(PluginBrowserError::manifest(format!(
                "plugin '{id}': id must not end with '{DISABLED_SUFFIX}'"
            )));
        }

        validate_http_url(&id, "downloadUrl", &record.download_url)?;
        let repository_url = match record.repository_url {
            Some(u) if !u.trim().is_empty() => {
                validate_http_url(&id, "repositoryUrl", &u)?;
                Some(u)
            },
            _ => None,
        };

        Ok(Self {
            id,
            name: record.name,
            author: record.author,
            version: record.version,
            description: record.description,
            download_url: record.download_url,
            compatibility: record.edmc_compatibility.filter(|c| !c.trim().is_empty()),
            repository_url,
        })
    }
}

fn validate_http_url(id: &str, field: &str, value: &str) -> PluginBrowserResult<()> {
    let parsed = url::Url::parse(value).map_err(|e| {
        PluginBrowserError::manifest(format!("plugin '{id}': {field} '{value}' is not a URL: {e}"))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PluginBrowserError::manifest(format!(
            "plugin '{id}': {field} must use http or https, got '{}'",
            parsed.scheme()
        )));
    }
    Ok(())
}

/// Parse and validate a manifest body.
///
/// Returns the plugins in manifest order.
///
/// # Errors
///
/// Returns [`PluginBrowserError::ManifestFormat`] if the body is not a JSON
/// array, any record is malformed or unsafe, or an id appears twice.
pub fn parse_manifest(bytes: &[u8]) -> PluginBrowserResult<Vec<AvailablePlugin>> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| PluginBrowserError::manifest(format!("not valid JSON: {e}")))?;

    let serde_json::Value::Array(items) = value else {
        return Err(PluginBrowserError::manifest(
            "top-level value must be an array of plugin records",
        ));
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut plugins = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let record: ManifestRecord = serde_json::from_value(item)
            .map_err(|e| PluginBrowserError::manifest(format!("record {index}: {e}")))?;
        let plugin = AvailablePlugin::try_from(record)?;

        if !seen.insert(plugin.id.clone()) {
            return Err(PluginBrowserError::manifest(format!(
                "duplicate plugin id '{}'",
                plugin.id
            )));
        }
        plugins.push(plugin);
    }

    Ok(plugins)
}

/// Look up a plugin by id.
#[must_use]
pub fn find_plugin<'a>(plugins: &'a [AvailablePlugin], id: &str) -> Option<&'a AvailablePlugin> {
    plugins.iter().find(|p| p.id == id)
}

/// Retrieves and validates the remote catalog.
#[derive(Debug, Clone)]
pub struct ManifestFetcher {
    transport: Arc<dyn Transport>,
    max_bytes: u64,
}

impl ManifestFetcher {
    /// Create a fetcher over the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            max_bytes: DEFAULT_MAX_MANIFEST_BYTES,
        }
    }

    /// Override the manifest size limit.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Fetch and validate the manifest at `url`.
    ///
    /// # Errors
    ///
    /// [`PluginBrowserError::Network`] on transport failure or non-success
    /// status, [`PluginBrowserError::ManifestFormat`] on a malformed body.
    pub async fn fetch(&self, url: &str) -> PluginBrowserResult<Vec<AvailablePlugin>> {
        self.fetch_cancellable(url, &CancellationToken::new()).await
    }

    /// Like [`fetch`](Self::fetch), but gives up with
    /// [`PluginBrowserError::Cancelled`] as soon as `cancel` fires.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn fetch_cancellable(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> PluginBrowserResult<Vec<AvailablePlugin>> {
        if url.trim().is_empty() {
            return Err(PluginBrowserError::Network {
                url: String::new(),
                message: "plugin manifest URL is not configured".into(),
            });
        }

        let body = fetch_cancellable(
            self.transport.as_ref(),
            url,
            self.max_bytes,
            cancel,
            "manifest refresh",
        )
        .await?;
        let plugins = parse_manifest(&body)?;

        debug!(url, count = plugins.len(), "Fetched plugin manifest");
        Ok(plugins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn record(id: &str) -> String {
        format!(
            r#"{{"id":"{id}","name":"Plugin {id}","version":"1.0.0","author":"a","description":"d","downloadUrl":"https://example.com/{id}.zip"}}"#
        )
    }

    #[test]
    fn parse_valid_manifest() {
        let body = format!("[{},{}]", record("foo"), record("bar"));
        let plugins = parse_manifest(body.as_bytes()).unwrap();
        assert_eq!(plugins.len(), 2);
        assert_eq!(plugins[0].id, "foo");
        assert_eq!(plugins[1].download_url, "https://example.com/bar.zip");
        assert!(plugins[0].compatibility.is_none());
    }

    #[test]
    fn parse_is_independent_of_formatting() {
        let compact = format!("[{},{}]", record("foo"), record("bar"));
        let pretty = format!("[\n    {},\n\n    {}\n]\n", record("foo"), record("bar"));
        assert_eq!(
            parse_manifest(compact.as_bytes()).unwrap(),
            parse_manifest(pretty.as_bytes()).unwrap()
        );
    }

    #[test]
    fn parse_optional_fields() {
        let body = r#"[{
            "id": "foo",
            "name": "Foo",
            "version": "2.0",
            "author": "me",
            "description": "desc",
            "downloadUrl": "https://example.com/foo.zip",
            "edmcCompatibility": ">=5.0.0",
            "repositoryUrl": "https://github.com/me/foo"
        }]"#;
        let plugins = parse_manifest(body.as_bytes()).unwrap();
        assert_eq!(plugins[0].compatibility.as_deref(), Some(">=5.0.0"));
        assert_eq!(
            plugins[0].repository_url.as_deref(),
            Some("https://github.com/me/foo")
        );
    }

    #[test]
    fn reject_non_array() {
        let err = parse_manifest(br#"{"plugins": []}"#).unwrap_err();
        assert!(matches!(err, PluginBrowserError::ManifestFormat { .. }));
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn reject_invalid_json() {
        let err = parse_manifest(b"[{").unwrap_err();
        assert!(matches!(err, PluginBrowserError::ManifestFormat { .. }));
    }

    #[test]
    fn reject_missing_required_field() {
        let body = r#"[{"id":"foo","name":"Foo","version":"1","author":"a","description":"d"}]"#;
        let err = parse_manifest(body.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("downloadUrl"), "got: {err}");
    }

    #[test]
    fn reject_unknown_field() {
        let body = r#"[{"id":"foo","name":"Foo","version":"1","author":"a","description":"d",
            "downloadUrl":"https://example.com/foo.zip","postInstall":"rm -rf /"}]"#;
        let err = parse_manifest(body.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("postInstall"), "got: {err}");
    }

    #[test]
    fn reject_duplicate_id_without_partial_ingest() {
        let body = format!("[{},{},{}]", record("foo"), record("bar"), record("foo"));
        let err = parse_manifest(body.as_bytes()).unwrap_err();
        assert!(matches!(err, PluginBrowserError::ManifestFormat { .. }));
        assert!(err.to_string().contains("duplicate plugin id 'foo'"));
    }

    #[test]
    fn reject_traversal_id() {
        let body = format!("[{}]", record("../evil"));
        let err = parse_manifest(body.as_bytes()).unwrap_err();
        assert!(matches!(err, PluginBrowserError::ManifestFormat { .. }));
    }

    #[test]
    fn reject_disabled_suffix_id() {
        let body = format!("[{}]", record("foo.disabled"));
        let err = parse_manifest(body.as_bytes()).unwrap_err();
        assert!(err.to_string().contains(".disabled"));
    }

    #[test]
    fn reject_non_http_download_url() {
        let body = r#"[{"id":"foo","name":"Foo","version":"1","author":"a","description":"d",
            "downloadUrl":"file:///etc/passwd"}]"#;
        let err = parse_manifest(body.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("http"), "got: {err}");
    }

    #[test]
    fn empty_manifest_is_valid() {
        assert!(parse_manifest(b"[]").unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_reads_through_transport() {
        let body = format!("[{}]", record("foo"));
        let transport = MemoryTransport::new().with_body("https://example.com/m.json", body);
        let fetcher = ManifestFetcher::new(Arc::new(transport));

        let plugins = fetcher.fetch("https://example.com/m.json").await.unwrap();
        assert_eq!(plugins.len(), 1);
    }

    #[tokio::test]
    async fn fetch_maps_http_failure_to_network_error() {
        let transport = MemoryTransport::new().with_status("https://example.com/m.json", 503);
        let fetcher = ManifestFetcher::new(Arc::new(transport));

        let err = fetcher.fetch("https://example.com/m.json").await.unwrap_err();
        assert!(matches!(err, PluginBrowserError::Network { .. }));
    }

    #[tokio::test]
    async fn fetch_rejects_empty_url() {
        let fetcher = ManifestFetcher::new(Arc::new(MemoryTransport::new()));
        let err = fetcher.fetch("  ").await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[tokio::test]
    async fn fetch_enforces_size_limit() {
        let body = format!("[{}]", record("foo"));
        let transport = MemoryTransport::new().with_body("https://example.com/m.json", body);
        let fetcher = ManifestFetcher::new(Arc::new(transport)).with_max_bytes(16);

        let err = fetcher.fetch("https://example.com/m.json").await.unwrap_err();
        assert!(matches!(err, PluginBrowserError::DownloadTooLarge { .. }));
    }
}

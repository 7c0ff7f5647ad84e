//! Byte transport for manifests and archives.
//!
//! The core only ever needs "GET this URL, give me the body". [`Transport`]
//! is that seam; [`HttpTransport`] implements it with `reqwest`, and
//! [`MemoryTransport`] serves canned responses for tests and offline
//! catalogs.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{PluginBrowserError, PluginBrowserResult};

/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Fetches response bodies by URL.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Download the body at `url`, reading at most `limit` bytes.
    ///
    /// # Errors
    ///
    /// [`PluginBrowserError::Network`] on transport failure or a
    /// non-success status, [`PluginBrowserError::DownloadTooLarge`] when the
    /// body exceeds `limit`.
    async fn get(&self, url: &str, limit: u64) -> PluginBrowserResult<Vec<u8>>;
}

/// Run [`Transport::get`] until it completes or `cancel` fires.
///
/// Dropping the in-flight request on cancellation discards everything read
/// so far; nothing has been written to disk at this point.
pub(crate) async fn fetch_cancellable(
    transport: &dyn Transport,
    url: &str,
    limit: u64,
    cancel: &CancellationToken,
    what: &str,
) -> PluginBrowserResult<Vec<u8>> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!(url, "Request cancelled");
            Err(PluginBrowserError::Cancelled(what.to_string()))
        },
        result = transport.get(url, limit) => result,
    }
}

/// `reqwest`-backed transport.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Build a client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PluginBrowserError::Network`] if the TLS backend cannot be
    /// initialized.
    pub fn new(timeout: Duration) -> PluginBrowserResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("plugin-browser/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(timeout)
            .build()
            .map_err(|e| PluginBrowserError::Network {
                url: String::new(),
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, limit: u64) -> PluginBrowserResult<Vec<u8>> {
        use futures::StreamExt;

        let network = |message: String| PluginBrowserError::Network {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(network(format!("server returned {}", response.status())));
        }

        // Check Content-Length if available
        if let Some(len) = response.content_length()
            && len > limit
        {
            return Err(PluginBrowserError::DownloadTooLarge { size: len, limit });
        }

        let capacity = usize::try_from(response.content_length().unwrap_or(0).min(limit)).unwrap_or(0);
        let mut bytes = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| network(format!("download error: {e}")))?;
            bytes.extend_from_slice(&chunk);
            let current_size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
            if current_size > limit {
                return Err(PluginBrowserError::DownloadTooLarge {
                    size: current_size,
                    limit,
                });
            }
        }

        debug!(url, bytes = bytes.len(), "Download complete");
        Ok(bytes)
    }
}

/// A canned response served by [`MemoryTransport`].
#[derive(Debug, Clone)]
enum MemoryResponse {
    Body(Vec<u8>),
    Status(u16),
}

/// In-memory transport keyed by exact URL.
///
/// Unknown URLs fail with a 404-style [`PluginBrowserError::Network`].
#[derive(Debug, Default)]
pub struct MemoryTransport {
    responses: DashMap<String, MemoryResponse>,
    delays: DashMap<String, Duration>,
    hits: DashMap<String, usize>,
}

impl MemoryTransport {
    /// Create an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn with_body(self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.responses
            .insert(url.into(), MemoryResponse::Body(body.into()));
        self
    }

    /// Answer `url` with a non-success HTTP status.
    #[must_use]
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.responses
            .insert(url.into(), MemoryResponse::Status(status));
        self
    }

    /// Wait `delay` before answering `url`.
    #[must_use]
    pub fn with_delay(self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }

    /// Replace or add the body for `url` after construction.
    pub fn set_body(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.responses
            .insert(url.into(), MemoryResponse::Body(body.into()));
    }

    /// How many times `url` has been requested.
    #[must_use]
    pub fn hits(&self, url: &str) -> usize {
        self.hits.get(url).map_or(0, |h| *h)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn get(&self, url: &str, limit: u64) -> PluginBrowserResult<Vec<u8>> {
        {
            let mut hits = self.hits.entry(url.to_string()).or_insert(0);
            *hits = hits.saturating_add(1);
        }

        let delay = self.delays.get(url).map(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.get(url).map(|r| r.value().clone());
        match response {
            Some(MemoryResponse::Body(body)) => {
                let size = u64::try_from(body.len()).unwrap_or(u64::MAX);
                if size > limit {
                    return Err(PluginBrowserError::DownloadTooLarge { size, limit });
                }
                Ok(body)
            },
            Some(MemoryResponse::Status(status)) => Err(PluginBrowserError::Network {
                url: url.to_string(),
                message: format!("server returned {status}"),
            }),
            None => Err(PluginBrowserError::Network {
                url: url.to_string(),
                message: "server returned 404 Not Found".into(),
            }),
        }
    }
}

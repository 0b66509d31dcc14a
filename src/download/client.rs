//! HTTP client wrapper for page and manifest requests.
//!
//! This module provides the `HttpClient` struct which streams page images to
//! disk and fetches small text documents with bounded timeouts.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::FetchError;
use crate::user_agent;

/// HTTP client shared by the manifest resolver and the page pipeline.
///
/// Create it once and reuse it for a whole run so page requests share pooled
/// connections to the book host.
///
/// # Example
///
/// ```no_run
/// use book_saver_core::download::HttpClient;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let bytes = client
///     .download_page("https://example.com/book/content/pages/page1.jpg", Path::new("001.jpg"))
///     .await?;
/// println!("wrote {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 10 seconds
    /// - Read timeout: 10 seconds between body chunks
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .read_timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Fetches a small text document, giving up after `timeout` in total.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the URL is invalid, the request fails or
    /// times out, or the server answers with a non-success status.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let response = self.send_get(url, Some(timeout)).await?;
        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }

    /// Streams a page image to `path`, returning the number of bytes written.
    ///
    /// The file is only created once the server has answered with a success
    /// status. If the body is interrupted the partial file is removed.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] when the file cannot be created or written,
    /// and the remote variants of [`FetchError`] for everything else.
    #[instrument(skip(self, path), fields(url = %url, path = %path.display()))]
    pub async fn download_page(&self, url: &str, path: &Path) -> Result<u64, FetchError> {
        let response = self.send_get(url, None).await?;

        let file = File::create(path)
            .await
            .map_err(|e| FetchError::io(path, e))?;

        let result = stream_to_file(file, response, url, path).await;
        if result.is_err() {
            debug!("cleaning up partial page after error");
            let _ = tokio::fs::remove_file(path).await;
        }
        let bytes = result?;

        debug!(bytes, "page written");
        Ok(bytes)
    }

    async fn send_get(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        Ok(response)
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::from_reqwest(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(file_path, e))?;

    Ok(bytes_written)
}

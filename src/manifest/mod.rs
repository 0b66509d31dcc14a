//! Page count discovery through optional `pages.xml` manifests.
//!
//! Readers sometimes publish a manifest listing every page of a book. The
//! location is not fixed, so a few conventional paths under the book root are
//! tried in order. Nothing here is fatal: any failure degrades to
//! [`PageCount::Unknown`] and the pipeline falls back to detecting the end of
//! the book from HTTP status codes.

mod error;
mod parse;

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::download::{HttpClient, MANIFEST_TIMEOUT};
use crate::locator::BookRoot;

pub use error::ManifestError;
pub use parse::{MANIFEST_MARKER, count_manifest_pages};

/// Manifest locations relative to the book root, in the order they are tried.
pub const MANIFEST_CANDIDATES: [&str; 3] = ["data/pages.xml", "pages.xml", "book/pages.xml"];

/// Total number of pages in a book, if a manifest said so.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCount {
    /// Authoritative count from a manifest (always at least 1).
    Known(u32),
    /// No manifest could be read.
    Unknown,
}

impl PageCount {
    /// Returns the known count, if any.
    #[must_use]
    pub fn known(self) -> Option<u32> {
        match self {
            Self::Known(count) => Some(count),
            Self::Unknown => None,
        }
    }

    /// Returns the known count, or `ceiling` when the count is unknown.
    #[must_use]
    pub fn total_or(self, ceiling: u32) -> u32 {
        self.known().unwrap_or(ceiling)
    }
}

impl fmt::Display for PageCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(count) => write!(f, "{count}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Looks up page manifests under a book root.
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    client: HttpClient,
    timeout: Duration,
}

impl ManifestResolver {
    /// Creates a resolver with the default per-request timeout.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self::with_timeout(client, MANIFEST_TIMEOUT)
    }

    /// Creates a resolver with an explicit per-request timeout.
    #[must_use]
    pub fn with_timeout(client: HttpClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Resolves the page count of the book at `root`.
    ///
    /// Candidates are tried in [`MANIFEST_CANDIDATES`] order and the first
    /// manifest with at least one page wins; later candidates are not
    /// requested.
    #[instrument(skip(self), fields(root = %root))]
    pub async fn resolve(&self, root: &BookRoot) -> PageCount {
        for candidate in MANIFEST_CANDIDATES {
            let url = root.join(candidate);
            match self.count_at(&url).await {
                Ok(0) => debug!(url = %url, "manifest lists no pages"),
                Ok(count) => {
                    let count = u32::try_from(count).unwrap_or(u32::MAX);
                    info!(url = %url, pages = count, "page count read from manifest");
                    return PageCount::Known(count);
                }
                Err(error) => warn!(url = %url, error = %error, "manifest unavailable"),
            }
        }

        info!("no manifest found; page count unknown");
        PageCount::Unknown
    }

    async fn count_at(&self, url: &str) -> Result<usize, ManifestError> {
        let body = self.client.fetch_text(url, self.timeout).await?;
        count_manifest_pages(&body)
    }
}

/// Resolves the page count of the book at `root` with default settings.
pub async fn resolve_page_count(client: &HttpClient, root: &BookRoot) -> PageCount {
    ManifestResolver::new(client.clone()).resolve(root).await
}

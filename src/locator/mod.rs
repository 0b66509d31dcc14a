//! Book root normalization.
//!
//! Online readers lay a book out under one base directory:
//!
//! ```text
//! {root}/index.html                    entry page
//! {root}/content/medium/page5.jpg      medium-resolution preview
//! {root}/content/pages/page5.jpg       full page image
//! {root}/data/pages.xml                optional page manifest
//! ```
//!
//! Users paste whichever of these they happen to have open. [`normalize`]
//! maps any of them back to the [`BookRoot`] without touching the network.

use std::fmt;

use tracing::{debug, instrument};
use url::Url;

/// Directory under the root holding full-size page images.
const PAGES_DIR: &str = "content/pages";

/// Canonical base location of a book, plus the identifier derived from it.
///
/// The location never ends with `/` and never carries a query or fragment,
/// so `{location}/content/pages/page{n}.jpg` is always a well-formed page URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookRoot {
    location: String,
    identifier: String,
}

impl BookRoot {
    /// Returns the canonical root location.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.location
    }

    /// Returns the percent-decoded last path segment of the root (may be empty).
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the host of the root, if it parses as a URL with one.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.location)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
    }

    /// Appends a relative path to the root.
    #[must_use]
    pub fn join(&self, relative: &str) -> String {
        format!("{}/{}", self.location, relative.trim_start_matches('/'))
    }

    /// Builds the full-size image URL for a one-based page number.
    #[must_use]
    pub fn page_url(&self, page: u32) -> String {
        self.join(&format!("{PAGES_DIR}/page{page}.jpg"))
    }
}

impl fmt::Display for BookRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// Normalizes a page, asset, or directory reference into its [`BookRoot`].
///
/// Never fails: input that does not parse as a URL is returned trimmed and
/// otherwise unchanged.
///
/// # Examples
///
/// ```
/// use book_saver_core::locator::normalize;
///
/// let root = normalize("https://example.com/lib/book1/content/medium/page5.jpg?v=2");
/// assert_eq!(root.as_str(), "https://example.com/lib/book1");
/// assert_eq!(root.identifier(), "book1");
/// ```
#[instrument(level = "debug")]
#[must_use]
pub fn normalize(reference: &str) -> BookRoot {
    let trimmed = reference.trim();

    let Ok(mut url) = Url::parse(trimmed) else {
        debug!("reference is not a URL; using it verbatim");
        let identifier = trimmed
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        return BookRoot {
            location: trimmed.trim_end_matches('/').to_string(),
            identifier,
        };
    };

    let segments = root_segments(url.path());
    let identifier = decode_identifier(segments.last().copied().unwrap_or_default());
    let path = segments.join("/");

    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);

    let location = url.as_str().trim_end_matches('/').to_string();
    debug!(root = %location, identifier = %identifier, "normalized book reference");

    BookRoot {
        location,
        identifier,
    }
}

/// Percent-decodes a path segment for use in file names.
///
/// Falls back to the raw segment when it does not decode to UTF-8. Path
/// separators produced by decoding are replaced with `_`.
fn decode_identifier(segment: &str) -> String {
    let decoded = urlencoding::decode(segment).unwrap_or_else(|e| {
        debug!(segment = %segment, error = %e, "identifier is not UTF-8; using raw segment");
        segment.into()
    });
    decoded.replace(['/', '\\'], "_")
}

/// Splits a URL path and drops the asset part of it, if any.
fn root_segments(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();

    let points_at_file = segments.last().is_some_and(|last| last.contains('.'));
    if points_at_file {
        let len = segments.len();
        let keep = if len >= 3 && segments[len - 3] == "content" && segments[len - 2] == "medium"
        {
            len - 3
        } else {
            len - 1
        };
        segments.truncate(keep);
    }

    segments
}

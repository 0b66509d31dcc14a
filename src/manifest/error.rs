//! Error types for manifest parsing.
//!
//! These never leave the crate's resolver: every variant degrades to
//! [`PageCount::Unknown`](super::PageCount::Unknown) and a log line.

use thiserror::Error;

use crate::download::FetchError;

/// Reasons a manifest could not be fetched or counted.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest request itself failed.
    #[error("manifest request failed: {0}")]
    Fetch(#[from] FetchError),

    /// The body does not contain the `<pages` marker at all.
    #[error("body does not look like a page manifest")]
    MissingMarker,

    /// The XML reader rejected the document.
    #[error("invalid manifest XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The document is well-tokenized but not a single well-formed element tree.
    #[error("malformed manifest: {reason}")]
    Malformed {
        /// What was wrong with the document structure.
        reason: &'static str,
    },
}

impl ManifestError {
    /// Creates a structural error.
    pub(crate) fn malformed(reason: &'static str) -> Self {
        Self::Malformed { reason }
    }
}

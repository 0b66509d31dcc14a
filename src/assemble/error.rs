//! Error types for document assembly.

use std::path::PathBuf;

use thiserror::Error;

/// Errors while combining page images into one document.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// Nothing to combine.
    #[error("no pages to assemble")]
    NoPages,

    /// A page could not be re-encoded as JPEG.
    #[error("failed to encode page {page}: {source}")]
    Image {
        /// Page number of the failing image.
        page: u32,
        /// The underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// The PDF writer failed.
    #[error("PDF error: {message}")]
    Pdf {
        /// Writer error text.
        message: String,
    },

    /// The EPUB builder failed.
    #[error("EPUB error: {message}")]
    Epub {
        /// Builder error text.
        message: String,
    },

    /// Writing or renaming the document failed.
    #[error("IO error writing {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl AssembleError {
    /// Creates an image encoding error.
    pub fn image(page: u32, source: image::ImageError) -> Self {
        Self::Image { page, source }
    }

    /// Creates a PDF error from any writer error.
    pub fn pdf(error: impl std::fmt::Display) -> Self {
        Self::Pdf {
            message: error.to_string(),
        }
    }

    /// Creates an EPUB error from any builder error.
    pub fn epub(error: impl std::fmt::Display) -> Self {
        Self::Epub {
            message: error.to_string(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

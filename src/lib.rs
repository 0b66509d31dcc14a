//! Book Saver Core Library
//!
//! This library downloads the page images of a remotely hosted book (an
//! image-per-page online reader) and keeps them either as a folder of images
//! or as one combined document.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`locator`] - Derives the book root from any page, asset, or book URL
//! - [`manifest`] - Discovers the page count from optional `pages.xml` manifests
//! - [`job`] - Page ranges, output modes, and input validation
//! - [`download`] - HTTP client and the sequential fetch pipeline
//! - [`assemble`] - PDF and EPUB encoders for combined output
//!
//! # Example
//!
//! ```no_run
//! use book_saver_core::{
//!     DownloadJob, HttpClient, OutputMode, PageSelection, Pipeline, ProgressSender,
//!     normalize, resolve_page_count, resolve_range,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let root = normalize("https://example.com/b/book1/content/medium/page5.jpg");
//! let count = resolve_page_count(&client, &root).await;
//! let range = resolve_range(PageSelection::All, count, 1000)?;
//!
//! let job = DownloadJob::new(root, range, count, OutputMode::default(), ".");
//! let report = Pipeline::new(client)
//!     .run(job, ProgressSender::disabled(), CancellationToken::new())
//!     .await?;
//! println!("saved {}", report.output_path().display());
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assemble;
pub mod download;
pub mod job;
pub mod locator;
pub mod manifest;
#[cfg(test)]
#[path = "../tests/support/socket_guard.rs"]
pub(crate) mod socket_guard;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use assemble::{AssembleError, DocumentEncoder, EpubEncoder, PdfEncoder, encoder_for};
pub use download::{
    FetchError, HttpClient, Pipeline, PipelineError, ProgressEvent, ProgressReceiver,
    ProgressSender, RetryPolicy, RunOutcome, RunReport, StopReason, progress_channel,
};
pub use job::{
    DEFAULT_PAGE_CEILING, DocumentFormat, DownloadJob, JobError, OutputMode, PageRange,
    PageSelection, folder_name, resolve_range, validate_reference,
};
pub use locator::{BookRoot, normalize};
pub use manifest::{ManifestError, ManifestResolver, PageCount, resolve_page_count};

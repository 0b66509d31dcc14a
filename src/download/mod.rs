//! Page fetching: the HTTP client, per-page retry, progress, and the pipeline.
//!
//! # Features
//!
//! - Streaming page downloads written straight to disk
//! - Bounded manifest requests
//! - Strictly sequential page order with end-of-book detection
//! - Optional per-page retry for transient failures
//! - Non-blocking progress channel and cooperative cancellation
//!
//! # Example
//!
//! ```no_run
//! use book_saver_core::download::HttpClient;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! client
//!     .download_page("https://example.com/b/book1/content/pages/page1.jpg", Path::new("001.jpg"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod pipeline;
mod progress;
mod retry;

pub use client::HttpClient;
pub use constants::{
    CONNECT_TIMEOUT_SECS, MANIFEST_TIMEOUT, PROGRESS_CHANNEL_CAPACITY, READ_TIMEOUT_SECS,
};
pub use error::{FetchError, PipelineError};
pub use pipeline::{Pipeline, RunOutcome, RunReport, StopReason};
pub use progress::{
    ProgressEvent, ProgressReceiver, ProgressSender, percent, progress_channel,
};
pub use retry::{
    DEFAULT_PAGE_RETRIES, FailureType, MAX_PAGE_RETRIES, RetryDecision, RetryPolicy,
    classify_error,
};

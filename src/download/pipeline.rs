//! Sequential fetch-and-assemble pipeline.
//!
//! A run walks the requested page range strictly in order. The first page
//! that cannot be fetched ends the run: without a manifest that is the only
//! way to learn where a book ends, so it is reported as an early stop and not
//! as an error. Only local filesystem failures and document assembly
//! failures abort a run with [`PipelineError`].
//!
//! # Example
//!
//! ```no_run
//! use book_saver_core::download::{HttpClient, Pipeline, ProgressSender};
//! use book_saver_core::job::{DownloadJob, OutputMode, PageRange};
//! use book_saver_core::locator::normalize;
//! use book_saver_core::manifest::PageCount;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let root = normalize("https://example.com/b/book1/index.html");
//! let job = DownloadJob::new(
//!     root,
//!     PageRange::new(1, 20)?,
//!     PageCount::Unknown,
//!     OutputMode::Images,
//!     "./downloads",
//! );
//! let pipeline = Pipeline::new(HttpClient::new());
//! let report = pipeline
//!     .run(job, ProgressSender::disabled(), CancellationToken::new())
//!     .await?;
//! println!("{} of {} pages", report.pages_fetched, report.pages_requested);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::HttpClient;
use super::error::{FetchError, PipelineError};
use super::progress::ProgressSender;
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use crate::assemble::{PageImage, write_document};
use crate::job::{DocumentFormat, DownloadJob, OutputMode, page_path};
use crate::locator::BookRoot;

/// Why a run ended before the last requested page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The server answered a page request with a non-success status.
    PageUnavailable {
        /// Page that was not available.
        page: u32,
        /// HTTP status of the response.
        status: u16,
    },
    /// The page request failed below HTTP (timeout, connection, body).
    TransportFailure {
        /// Page whose request failed.
        page: u32,
        /// Description of the failure.
        message: String,
    },
    /// The page was fetched but is not a decodable image.
    UndecodablePage {
        /// Page that could not be decoded.
        page: u32,
    },
    /// The caller cancelled the run before this page was requested.
    Cancelled {
        /// First page that was not requested.
        page: u32,
    },
}

impl StopReason {
    /// Page at which the run stopped.
    #[must_use]
    pub fn page(&self) -> u32 {
        match self {
            Self::PageUnavailable { page, .. }
            | Self::TransportFailure { page, .. }
            | Self::UndecodablePage { page }
            | Self::Cancelled { page } => *page,
        }
    }

    fn from_fetch_error(page: u32, error: &FetchError) -> Self {
        match error.status() {
            Some(status) => Self::PageUnavailable { page, status },
            None => Self::TransportFailure {
                page,
                message: error.to_string(),
            },
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageUnavailable { page, status } => {
                write!(f, "page {page} unavailable (HTTP {status})")
            }
            Self::TransportFailure { page, message } => {
                write!(f, "page {page} failed: {message}")
            }
            Self::UndecodablePage { page } => write!(f, "page {page} is not a readable image"),
            Self::Cancelled { page } => write!(f, "cancelled before page {page}"),
        }
    }
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every requested page was fetched.
    Completed,
    /// The run ended early; everything fetched before was finalized.
    StoppedEarly(StopReason),
}

impl RunOutcome {
    /// Returns true when the run was cancelled by the caller.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::StoppedEarly(StopReason::Cancelled { .. }))
    }
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Name shared by the page folder and the document.
    pub output_name: String,
    /// Folder that received the page images.
    pub pages_dir: PathBuf,
    /// Combined document, when one was written.
    pub document: Option<PathBuf>,
    /// Pages successfully fetched.
    pub pages_fetched: u32,
    /// Pages in the requested range.
    pub pages_requested: u32,
    /// Completed or stopped early.
    pub outcome: RunOutcome,
}

impl RunReport {
    /// The document if one was written, otherwise the page folder.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        self.document.as_deref().unwrap_or(&self.pages_dir)
    }
}

/// Runs download jobs, one at a time.
///
/// A `Pipeline` owns a busy flag: a second [`Pipeline::run`] while one is in
/// flight fails with [`PipelineError::Busy`] without touching the filesystem.
#[derive(Debug)]
pub struct Pipeline {
    client: HttpClient,
    retry_policy: RetryPolicy,
    busy: AtomicBool,
}

/// Holds the busy flag for the lifetime of a run.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Why a single page did not produce a file.
enum PageFailure {
    Stop(StopReason),
    Fatal(PipelineError),
}

impl Pipeline {
    /// Creates a pipeline that never retries a failed page.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self::with_retry_policy(client, RetryPolicy::default())
    }

    /// Creates a pipeline with an explicit per-page retry policy.
    #[must_use]
    pub fn with_retry_policy(client: HttpClient, retry_policy: RetryPolicy) -> Self {
        Self {
            client,
            retry_policy,
            busy: AtomicBool::new(false),
        }
    }

    /// Returns true while a run is in progress.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Fetches the pages of `job` and finalizes the output.
    ///
    /// Progress is reported after every page attempt and reset once the run
    /// is over, whether it succeeded or failed. `cancel` is checked before
    /// each page and while waiting to retry; a cancelled run is finalized
    /// like any other early stop.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Busy`] if another run is in progress
    /// - [`PipelineError::Io`] if the page folder or a page file cannot be written
    /// - [`PipelineError::Assemble`] if the combined document cannot be encoded
    /// - [`PipelineError::Task`] if a decode or encode task panicked
    #[instrument(skip_all, fields(root = %job.root, range = %job.range))]
    pub async fn run(
        &self,
        job: DownloadJob,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<RunReport, PipelineError> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            warn!("pipeline already running");
            return Err(PipelineError::Busy);
        };

        let result = self.execute(&job, &progress, &cancel).await;
        progress.reset();
        result
    }

    async fn execute(
        &self,
        job: &DownloadJob,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<RunReport, PipelineError> {
        let output_name = job.output_name();
        let pages_dir = job.pages_dir();
        let requested = job.range.len();
        let decode_pages = matches!(job.output_mode, OutputMode::Document(_));

        tokio::fs::create_dir_all(&pages_dir)
            .await
            .map_err(|e| PipelineError::io(&pages_dir, e))?;

        info!(
            output = %output_name,
            pages = requested,
            mode = ?job.output_mode,
            "starting run"
        );

        let mut images: Vec<PageImage> = Vec::new();
        let mut fetched = 0u32;
        let mut stop: Option<StopReason> = None;

        for page in job.range.pages() {
            if cancel.is_cancelled() {
                stop = Some(StopReason::Cancelled { page });
            } else {
                match self.fetch_page(&job.root, page, &pages_dir, cancel).await {
                    Ok(path) if decode_pages => match decode_page(page, path).await? {
                        Some(image) => {
                            images.push(image);
                            fetched += 1;
                        }
                        None => {
                            warn!(
                                url = %job.root.page_url(page),
                                page,
                                "page is not a readable image"
                            );
                            stop = Some(StopReason::UndecodablePage { page });
                        }
                    },
                    Ok(_) => fetched += 1,
                    Err(PageFailure::Stop(reason)) => stop = Some(reason),
                    Err(PageFailure::Fatal(error)) => return Err(error),
                }
            }

            progress.page(page, fetched, requested);

            if let Some(reason) = &stop {
                info!(page, fetched, reason = %reason, "stopping run");
                break;
            }
        }

        let document = match (job.output_mode, job.document_path()) {
            (OutputMode::Document(format), Some(target)) => {
                finalize_document(format, images, &output_name, &target, &pages_dir).await?
            }
            _ => None,
        };

        let outcome = stop.map_or(RunOutcome::Completed, RunOutcome::StoppedEarly);
        info!(fetched, requested, outcome = ?outcome, "run finished");

        Ok(RunReport {
            output_name,
            pages_dir,
            document,
            pages_fetched: fetched,
            pages_requested: requested,
            outcome,
        })
    }

    /// Fetches one page to disk, retrying transient failures per policy.
    #[instrument(skip(self, root, pages_dir, cancel))]
    async fn fetch_page(
        &self,
        root: &BookRoot,
        page: u32,
        pages_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, PageFailure> {
        let url = root.page_url(page);
        let path = page_path(pages_dir, page);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let error = match self.client.download_page(&url, &path).await {
                Ok(bytes) => {
                    debug!(url = %url, bytes, "page fetched");
                    return Ok(path);
                }
                Err(FetchError::Io { path, source }) => {
                    return Err(PageFailure::Fatal(PipelineError::io(path, source)));
                }
                Err(error) => error,
            };

            match self.retry_policy.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        url = %url,
                        attempt = next_attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying page"
                    );
                    tokio::select! {
                        () = cancel.cancelled() => {
                            return Err(PageFailure::Stop(StopReason::Cancelled { page }));
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url = %url, error = %error, %reason, "page not retried");
                    return Err(PageFailure::Stop(StopReason::from_fetch_error(page, &error)));
                }
            }
        }
    }
}

/// Decodes a freshly written page off the async runtime.
///
/// Returns `Ok(None)` when the file is not a readable image.
async fn decode_page(page: u32, path: PathBuf) -> Result<Option<PageImage>, PipelineError> {
    let decoded = tokio::task::spawn_blocking(move || {
        let result = PageImage::open(page, &path);
        (path, result)
    })
    .await?;

    match decoded {
        (_, Ok(image)) => Ok(Some(image)),
        (path, Err(error)) => {
            debug!(page, path = %path.display(), error = %error, "decode failed");
            Ok(None)
        }
    }
}

/// Writes the combined document and removes the page folder.
///
/// Nothing is written when no page was fetched; the folder then stays.
async fn finalize_document(
    format: DocumentFormat,
    images: Vec<PageImage>,
    title: &str,
    target: &Path,
    pages_dir: &Path,
) -> Result<Option<PathBuf>, PipelineError> {
    if images.is_empty() {
        info!(folder = %pages_dir.display(), "no pages fetched; no document written");
        return Ok(None);
    }

    let title_owned = title.to_string();
    let target_owned = target.to_path_buf();
    tokio::task::spawn_blocking(move || {
        write_document(format, &images, &title_owned, &target_owned)
    })
    .await??;

    if let Err(error) = tokio::fs::remove_dir_all(pages_dir).await {
        warn!(folder = %pages_dir.display(), error = %error, "failed to remove page folder");
    }

    Ok(Some(target.to_path_buf()))
}

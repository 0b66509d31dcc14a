//! Retry logic with exponential backoff for transient page failures.
//!
//! When a page request fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - Temporary failures that may succeed on retry
//! - [`FailureType::RateLimited`] - Server rate limiting (retries with backoff)
//! - [`FailureType::Permanent`] - Failures that won't succeed regardless of retries
//!
//! A 404 is permanent on purpose: past the last page it is how the book ends.
//! The default policy performs no retries at all, so the first failure of any
//! kind ends the run.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use book_saver_core::download::{FetchError, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::with_max_retries(2);
//! let error = FetchError::http_status("https://example.com/page3.jpg", 503);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(attempt, 2);
//!         assert!(delay >= Duration::from_millis(500));
//!     }
//!     RetryDecision::DoNotRetry { reason } => panic!("unexpected: {reason}"),
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::FetchError;

/// Default number of retries per page (none).
pub const DEFAULT_PAGE_RETRIES: u32 = 0;

/// Upper bound accepted for per-page retries.
pub const MAX_PAGE_RETRIES: u32 = 5;

/// Default base delay for exponential backoff.
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Default maximum delay cap.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Maximum jitter added to delays.
const MAX_JITTER: Duration = Duration::from_millis(250);

/// Classification of page failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: timeout, connection reset, 5xx server errors.
    Transient,

    /// Failure that won't succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, 403 Forbidden, invalid URL, local IO errors.
    Permanent,

    /// Server rate limiting (HTTP 429).
    RateLimited,
}

/// Decision on whether to retry a failed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the page after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the page.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Per-page retry configuration.
///
/// # Delay Calculation
///
/// ```text
/// delay = min(base_delay * 2^(retry - 1), max_delay) + jitter
/// ```
///
/// With defaults, delays are approximately 0.5s, 1s, 2s, 4s, 8s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    max_retries: u32,

    /// Delay before the first retry.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_PAGE_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a retry policy with custom settings.
    ///
    /// `max_retries` is clamped to [`MAX_PAGE_RETRIES`].
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.min(MAX_PAGE_RETRIES),
            base_delay,
            max_delay,
        }
    }

    /// Creates a policy with a custom retry count, using defaults for other settings.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.min(MAX_PAGE_RETRIES),
            ..Self::default()
        }
    }

    /// Returns the number of retries configured.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Determines whether to retry a failed page.
    ///
    /// `attempt` is the attempt number that just failed (1-indexed).
    #[instrument(skip(self), fields(max_retries = self.max_retries))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure".to_string(),
            };
        }

        if attempt > self.max_retries {
            debug!(attempt, max = self.max_retries, "retries exhausted");
            return RetryDecision::DoNotRetry {
                reason: format!("retries ({}) exhausted", self.max_retries),
            };
        }

        let delay = self.calculate_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Backoff for the retry following failed attempt `attempt`, before jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        self.backoff(attempt) + jitter()
    }
}

/// Random jitter between 0 and [`MAX_JITTER`].
fn jitter() -> Duration {
    let max_ms = u64::try_from(MAX_JITTER.as_millis()).unwrap_or(0);
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

/// Classifies a fetch error into a failure type for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | HTTP 408 | Transient |
/// | HTTP 429 | RateLimited |
/// | HTTP 5xx | Transient |
/// | other HTTP status | Permanent |
/// | Timeout | Transient |
/// | Network (TLS) | Permanent |
/// | Network (other) | Transient |
/// | IO, InvalidUrl | Permanent |
#[must_use]
pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::HttpStatus { status, .. } => classify_http_status(*status),
        FetchError::Timeout { .. } => FailureType::Transient,
        FetchError::Network { source, .. } => {
            if is_tls_error(source) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }
        FetchError::Io { .. } | FetchError::InvalidUrl { .. } => FailureType::Permanent,
    }
}

fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 => FailureType::Transient,
        429 => FailureType::RateLimited,
        500..=599 => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

/// Checks if a reqwest error is a TLS/certificate error.
fn is_tls_error(error: &reqwest::Error) -> bool {
    let error_string = error.to_string().to_lowercase();
    error_string.contains("certificate")
        || error_string.contains("tls")
        || error_string.contains("ssl")
        || error_string.contains("handshake")
}

//! Constants for the download module (timeouts, channel sizes).

use std::time::Duration;

/// Default HTTP connect timeout in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default HTTP read timeout in seconds (idle time between body chunks).
pub const READ_TIMEOUT_SECS: u64 = 10;

/// Total time allowed for one manifest request.
pub const MANIFEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default capacity of the progress channel.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 64;

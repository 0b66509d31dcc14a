//! Shared User-Agent string for page and manifest requests.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/book-saver";

/// Default User-Agent for every request the crate sends (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("book-saver/{version} (page-image-archiver; +{PROJECT_UA_URL})")
}

//! Download job description and input validation.
//!
//! A [`DownloadJob`] is built once per run from validated user input and then
//! handed to the pipeline by value; nothing about a run lives outside it.

mod error;

use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::locator::BookRoot;
use crate::manifest::PageCount;

pub use error::JobError;

/// Upper bound for "all pages" when no manifest gave the real count.
pub const DEFAULT_PAGE_CEILING: u32 = 1000;

/// Range descriptor used in output names when every page is requested.
const FULL_DESCRIPTOR: &str = "full";

/// Name used when neither the root nor its host yields an identifier.
const FALLBACK_IDENTIFIER: &str = "book";

/// Inclusive, one-based range of page numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    start: u32,
    end: u32,
}

impl PageRange {
    /// Creates a range after checking `1 <= start <= end`.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::RangeOutOfBounds`] when the range is empty or
    /// starts at zero.
    pub fn new(start: u32, end: u32) -> Result<Self, JobError> {
        if start < 1 || end < start {
            return Err(JobError::RangeOutOfBounds {
                start,
                end,
                max: end.max(start),
            });
        }
        Ok(Self { start, end })
    }

    /// First page of the range.
    #[must_use]
    pub fn start(self) -> u32 {
        self.start
    }

    /// Last page of the range.
    #[must_use]
    pub fn end(self) -> u32 {
        self.end
    }

    /// Number of pages requested.
    #[must_use]
    pub fn len(self) -> u32 {
        self.end - self.start + 1
    }

    /// Always false; a valid range holds at least one page.
    #[must_use]
    pub fn is_empty(self) -> bool {
        false
    }

    /// Page numbers in ascending order.
    #[must_use]
    pub fn pages(self) -> RangeInclusive<u32> {
        self.start..=self.end
    }

    /// True when the range is exactly `1..=count` for a known count.
    #[must_use]
    pub fn covers_book(self, count: PageCount) -> bool {
        self.start == 1 && count.known() == Some(self.end)
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Page range as entered by the user, before the page count is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSelection {
    /// Every page of the book.
    #[default]
    All,
    /// An explicit inclusive range.
    Range {
        /// First requested page.
        start: u32,
        /// Last requested page.
        end: u32,
    },
}

impl FromStr for PageSelection {
    type Err = JobError;

    /// Parses `all`, a single page `N`, or `START-END`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }

        let parse = |value: &str| {
            value
                .trim()
                .parse::<u32>()
                .map_err(|_| JobError::invalid_page_numbers(input))
        };

        match trimmed.split_once('-') {
            Some((start, end)) => Ok(Self::Range {
                start: parse(start)?,
                end: parse(end)?,
            }),
            None => {
                let page = parse(trimmed)?;
                Ok(Self::Range {
                    start: page,
                    end: page,
                })
            }
        }
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Range { start, end } => write!(f, "{start}-{end}"),
        }
    }
}

/// Turns a selection into a concrete range for a book of `count` pages.
///
/// When the count is unknown, `ceiling` stands in for the last page.
///
/// # Errors
///
/// Returns [`JobError::RangeOutOfBounds`] when an explicit range is empty,
/// starts at zero, or ends past the last page.
pub fn resolve_range(
    selection: PageSelection,
    count: PageCount,
    ceiling: u32,
) -> Result<PageRange, JobError> {
    let max = count.total_or(ceiling);
    match selection {
        PageSelection::All => PageRange::new(1, max.max(1)),
        PageSelection::Range { start, end } => {
            if start < 1 || end < start || end > max {
                return Err(JobError::RangeOutOfBounds { start, end, max });
            }
            PageRange::new(start, end)
        }
    }
}

/// Checks a user-supplied reference and returns it trimmed.
///
/// # Errors
///
/// Returns [`JobError::EmptyReference`] for blank input and
/// [`JobError::PlaceholderReference`] when the input equals `placeholder`.
pub fn validate_reference<'a>(raw: &'a str, placeholder: Option<&str>) -> Result<&'a str, JobError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(JobError::EmptyReference);
    }
    if placeholder.is_some_and(|placeholder| placeholder.trim() == trimmed) {
        return Err(JobError::PlaceholderReference);
    }
    Ok(trimmed)
}

/// Document container used when pages are combined into one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    /// One PDF page per image.
    #[default]
    Pdf,
    /// Fixed-layout-style EPUB with one XHTML page per image.
    Epub,
}

impl DocumentFormat {
    /// File extension of the combined document.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Epub => "epub",
        }
    }
}

/// What a finished run leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Keep every page as `{NNN}.jpg` in the run folder.
    Images,
    /// Combine the pages into one document and delete the run folder.
    Document(DocumentFormat),
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::Document(DocumentFormat::default())
    }
}

/// Output name for a run: `{identifier}_full` or `{identifier}_{start}-{end}`.
///
/// An empty identifier (a book at the host root) falls back to the host name.
#[must_use]
pub fn folder_name(root: &BookRoot, range: PageRange, count: PageCount) -> String {
    let identifier = if root.identifier().is_empty() {
        root.host()
            .unwrap_or_else(|| FALLBACK_IDENTIFIER.to_string())
    } else {
        root.identifier().to_string()
    };

    if range.covers_book(count) {
        format!("{identifier}_{FULL_DESCRIPTOR}")
    } else {
        format!("{identifier}_{range}")
    }
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// Book to download.
    pub root: BookRoot,
    /// Pages to request, in order.
    pub range: PageRange,
    /// Page count known before the run; only used for naming.
    pub page_count: PageCount,
    /// Image folder or combined document.
    pub output_mode: OutputMode,
    /// Folder that receives the run folder or the document.
    pub destination: PathBuf,
}

impl DownloadJob {
    /// Creates a job.
    #[must_use]
    pub fn new(
        root: BookRoot,
        range: PageRange,
        page_count: PageCount,
        output_mode: OutputMode,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root,
            range,
            page_count,
            output_mode,
            destination: destination.into(),
        }
    }

    /// Name shared by the page folder and the combined document.
    #[must_use]
    pub fn output_name(&self) -> String {
        folder_name(&self.root, self.range, self.page_count)
    }

    /// Folder that receives the per-page images.
    #[must_use]
    pub fn pages_dir(&self) -> PathBuf {
        self.destination.join(self.output_name())
    }

    /// Path of the combined document, when one is requested.
    #[must_use]
    pub fn document_path(&self) -> Option<PathBuf> {
        match self.output_mode {
            OutputMode::Images => None,
            OutputMode::Document(format) => Some(
                self.destination
                    .join(format!("{}.{}", self.output_name(), format.extension())),
            ),
        }
    }
}

/// File name of one page image inside the page folder.
#[must_use]
pub fn page_file_name(page: u32) -> String {
    format!("{page:03}.jpg")
}

/// Full path of one page image inside `pages_dir`.
#[must_use]
pub fn page_path(pages_dir: &Path, page: u32) -> PathBuf {
    pages_dir.join(page_file_name(page))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::locator::normalize;

    #[test]
    fn test_page_range_rejects_zero_start_and_reversed_bounds() {
        assert!(PageRange::new(0, 5).is_err());
        assert!(PageRange::new(6, 5).is_err());
        let range = PageRange::new(3, 3).unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range.pages().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_selection_parses_all_single_and_range() {
        assert_eq!("all".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!(" ALL ".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!(
            "7".parse::<PageSelection>().unwrap(),
            PageSelection::Range { start: 7, end: 7 }
        );
        assert_eq!(
            " 2 - 40 ".parse::<PageSelection>().unwrap(),
            PageSelection::Range { start: 2, end: 40 }
        );
    }

    #[test]
    fn test_selection_rejects_non_numeric_input() {
        for input in ["", "abc", "1-", "-5", "1-x", "1.5-3", "1-2-3"] {
            let result = input.parse::<PageSelection>();
            assert!(
                matches!(result, Err(JobError::InvalidPageNumbers { .. })),
                "Expected InvalidPageNumbers for {input:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_resolve_range_all_uses_known_count() {
        let range = resolve_range(PageSelection::All, PageCount::Known(42), 1000).unwrap();
        assert_eq!((range.start(), range.end()), (1, 42));
    }

    #[test]
    fn test_resolve_range_all_uses_ceiling_when_unknown() {
        let range = resolve_range(PageSelection::All, PageCount::Unknown, 1000).unwrap();
        assert_eq!((range.start(), range.end()), (1, 1000));
    }

    #[test]
    fn test_resolve_range_rejects_end_past_known_count() {
        let error = resolve_range(
            PageSelection::Range { start: 1, end: 50 },
            PageCount::Known(42),
            1000,
        )
        .unwrap_err();
        assert_eq!(
            error,
            JobError::RangeOutOfBounds {
                start: 1,
                end: 50,
                max: 42
            }
        );
        assert!(error.to_string().contains("Maximum: 42"));
    }

    #[test]
    fn test_resolve_range_rejects_zero_and_reversed() {
        let zero = resolve_range(PageSelection::Range { start: 0, end: 3 }, PageCount::Unknown, 1000);
        assert!(zero.is_err());
        let reversed =
            resolve_range(PageSelection::Range { start: 9, end: 3 }, PageCount::Unknown, 1000);
        assert!(reversed.is_err());
    }

    #[test]
    fn test_validate_reference() {
        assert_eq!(validate_reference("  https://h/b  ", None).unwrap(), "https://h/b");
        assert_eq!(validate_reference("   ", None), Err(JobError::EmptyReference));
        assert_eq!(
            validate_reference("www.paste-link-here.example", Some("www.paste-link-here.example")),
            Err(JobError::PlaceholderReference)
        );
    }

    #[test]
    fn test_folder_name_full_only_for_known_complete_range() {
        let root = normalize("https://h/b/book1/");
        let range = PageRange::new(1, 20).unwrap();

        assert_eq!(folder_name(&root, range, PageCount::Known(20)), "book1_full");
        assert_eq!(folder_name(&root, range, PageCount::Known(21)), "book1_1-20");
        assert_eq!(folder_name(&root, range, PageCount::Unknown), "book1_1-20");

        let partial = PageRange::new(2, 20).unwrap();
        assert_eq!(folder_name(&root, partial, PageCount::Known(20)), "book1_2-20");
    }

    #[test]
    fn test_folder_name_falls_back_to_host() {
        let root = normalize("https://reader.example.org/index.html");
        let range = PageRange::new(1, 3).unwrap();
        assert_eq!(
            folder_name(&root, range, PageCount::Unknown),
            "reader.example.org_1-3"
        );
    }

    #[test]
    fn test_job_paths() {
        let root = normalize("https://h/b/book1/index.html");
        let range = PageRange::new(1, 5).unwrap();
        let job = DownloadJob::new(
            root.clone(),
            range,
            PageCount::Known(5),
            OutputMode::Document(DocumentFormat::Pdf),
            "/out",
        );
        assert_eq!(job.pages_dir(), PathBuf::from("/out/book1_full"));
        assert_eq!(job.document_path(), Some(PathBuf::from("/out/book1_full.pdf")));

        let images = DownloadJob::new(root, range, PageCount::Unknown, OutputMode::Images, "/out");
        assert_eq!(images.pages_dir(), PathBuf::from("/out/book1_1-5"));
        assert_eq!(images.document_path(), None);
    }

    #[test]
    fn test_page_file_name_is_zero_padded() {
        assert_eq!(page_file_name(1), "001.jpg");
        assert_eq!(page_file_name(42), "042.jpg");
        assert_eq!(page_file_name(1234), "1234.jpg");
    }
}

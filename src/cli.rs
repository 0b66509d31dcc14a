//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use book_saver_core::DEFAULT_PAGE_CEILING;
use book_saver_core::download::MAX_PAGE_RETRIES;
use book_saver_core::job::{DocumentFormat, OutputMode};
use clap::{Parser, ValueEnum};

/// Text shown as the reference placeholder in usage output.
pub const REFERENCE_PLACEHOLDER: &str = "<REFERENCE>";

/// Save the page images of an online book as a PDF, an EPUB, or an image folder.
///
/// REFERENCE may be the book's entry page, any page or preview image inside
/// it, or the book's base URL.
#[derive(Parser, Debug, Clone)]
#[command(name = "book-saver")]
#[command(author, version, about)]
pub struct Args {
    /// Book, page, or page-image URL
    pub reference: String,

    /// Pages to fetch: `all`, a single page `N`, or `START-END`
    #[arg(short, long, default_value = "all")]
    pub pages: String,

    /// Folder that receives the output (default: current directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Pdf)]
    pub format: FormatArg,

    /// Retries per page for transient failures (0-5, 0 = first failure ends the book)
    #[arg(short = 'r', long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=i64::from(MAX_PAGE_RETRIES)))]
    pub page_retries: u8,

    /// Last page tried for `all` when the book has no page manifest (1-100000)
    #[arg(long, default_value_t = DEFAULT_PAGE_CEILING, value_parser = clap::value_parser!(u32).range(1..=100_000))]
    pub page_ceiling: u32,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// HTTP read timeout in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    /// Print the book root and page count, then exit without downloading
    #[arg(long)]
    pub probe: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Output format choices on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// One PDF with a page per image
    Pdf,
    /// One EPUB with a page per image
    Epub,
    /// Keep the page images in a folder
    Images,
}

impl FormatArg {
    /// Maps the CLI choice onto the library output mode.
    pub fn output_mode(self) -> OutputMode {
        match self {
            Self::Pdf => OutputMode::Document(DocumentFormat::Pdf),
            Self::Epub => OutputMode::Document(DocumentFormat::Epub),
            Self::Images => OutputMode::Images,
        }
    }
}

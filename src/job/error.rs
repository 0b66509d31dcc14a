//! Validation errors raised before a run starts.
//!
//! The display text of each variant is shown to the user as-is.

use thiserror::Error;

/// Input rejected before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// No reference was given.
    #[error("Enter a link to a book or to one of its pages")]
    EmptyReference,

    /// The reference is still the input field's placeholder text.
    #[error("Replace the placeholder with a link to a book or to one of its pages")]
    PlaceholderReference,

    /// Page numbers are not integers.
    #[error("Enter valid page numbers (expected `all`, `N` or `START-END`, got `{input}`)")]
    InvalidPageNumbers {
        /// The text that failed to parse.
        input: String,
    },

    /// The range is empty, starts below 1, or runs past the last page.
    #[error("Invalid page range {start}-{end}! Maximum: {max}")]
    RangeOutOfBounds {
        /// Requested first page.
        start: u32,
        /// Requested last page.
        end: u32,
        /// Last page that may be requested.
        max: u32,
    },
}

impl JobError {
    /// Creates a page number parse error.
    pub fn invalid_page_numbers(input: impl Into<String>) -> Self {
        Self::InvalidPageNumbers {
            input: input.into(),
        }
    }
}

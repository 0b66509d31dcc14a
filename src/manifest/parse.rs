//! Page counting for `pages.xml` manifests.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::error::ManifestError;

/// Substring a response body must contain before it is parsed at all.
pub const MANIFEST_MARKER: &str = "<pages";

const PAGE_ELEMENT: &[u8] = b"page";

/// Counts `page` elements anywhere below the document root.
///
/// The root element itself is never counted, matching a descendant search
/// (`.//page`). Returns `Ok(0)` for a well-formed manifest without pages.
///
/// # Errors
///
/// Returns [`ManifestError`] when the body lacks the manifest marker or is
/// not a single well-formed XML element tree.
///
/// # Examples
///
/// ```
/// use book_saver_core::manifest::count_manifest_pages;
///
/// let xml = r#"<pages><page src="1.jpg"/><page src="2.jpg"/></pages>"#;
/// assert_eq!(count_manifest_pages(xml).unwrap(), 2);
/// ```
pub fn count_manifest_pages(body: &str) -> Result<usize, ManifestError> {
    if !body.contains(MANIFEST_MARKER) {
        return Err(ManifestError::MissingMarker);
    }

    let mut reader = Reader::from_str(body);
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut pages = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                pages += count_if_page(&element, depth);
                enter_element(&mut seen_root, depth)?;
                depth += 1;
            }
            Event::Empty(element) => {
                pages += count_if_page(&element, depth);
                enter_element(&mut seen_root, depth)?;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
            }
            Event::Text(text) if depth == 0 => {
                if !text.iter().all(u8::is_ascii_whitespace) {
                    return Err(ManifestError::malformed("text outside the root element"));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(ManifestError::malformed("no root element"));
    }
    if depth != 0 {
        return Err(ManifestError::malformed("unclosed element"));
    }

    Ok(pages)
}

fn count_if_page(element: &BytesStart<'_>, depth: usize) -> usize {
    usize::from(depth > 0 && element.name().as_ref() == PAGE_ELEMENT)
}

fn enter_element(seen_root: &mut bool, depth: usize) -> Result<(), ManifestError> {
    if depth == 0 {
        if *seen_root {
            return Err(ManifestError::malformed("more than one root element"));
        }
        *seen_root = true;
    }
    Ok(())
}

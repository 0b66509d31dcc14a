//! Combining fetched pages into a single document.
//!
//! Every page is decoded once while it is fetched (see the pipeline) and kept
//! as a [`PageImage`]. At the end of a run the images are handed, in page
//! order, to a [`DocumentEncoder`] for the requested [`DocumentFormat`].
//!
//! Encoding is synchronous and CPU-bound; callers on an async runtime should
//! run [`write_document`] under `spawn_blocking`.

mod epub;
mod error;
mod pdf;

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, info, instrument};

use crate::job::DocumentFormat;

pub use epub::EpubEncoder;
pub use error::AssembleError;
pub use pdf::PdfEncoder;

/// JPEG quality used when re-encoding pages for a document.
const JPEG_QUALITY: u8 = 90;

/// One decoded page, tagged with its page number.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// One-based page number.
    pub page: u32,
    /// Decoded pixels.
    pub image: DynamicImage,
}

impl PageImage {
    /// Decodes a page image from disk, sniffing the format from its content.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`image::ImageError`] if the file cannot be
    /// read or decoded.
    pub fn open(page: u32, path: &Path) -> Result<Self, image::ImageError> {
        let image = image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode()?;
        Ok(Self { page, image })
    }
}

/// Writes a list of page images as one document file.
pub trait DocumentEncoder: Send + Sync {
    /// File extension of documents this encoder produces.
    fn extension(&self) -> &'static str;

    /// Encodes `pages`, in the given order, into a document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError`] if any page cannot be encoded or the
    /// document cannot be written.
    fn encode(&self, pages: &[PageImage], title: &str, path: &Path) -> Result<(), AssembleError>;
}

/// Returns the encoder for a document format.
#[must_use]
pub fn encoder_for(format: DocumentFormat) -> Box<dyn DocumentEncoder> {
    match format {
        DocumentFormat::Pdf => Box::new(PdfEncoder),
        DocumentFormat::Epub => Box::new(EpubEncoder),
    }
}

/// Encodes `pages` into a document at `path`.
///
/// The document is written to `{path}.part` first and renamed into place only
/// after encoding succeeded, so a failure never leaves a truncated document
/// under the final name.
///
/// # Errors
///
/// Returns [`AssembleError::NoPages`] for an empty page list, and any
/// encoder or filesystem error otherwise.
#[instrument(skip(pages), fields(pages = pages.len(), path = %path.display()))]
pub fn write_document(
    format: DocumentFormat,
    pages: &[PageImage],
    title: &str,
    path: &Path,
) -> Result<(), AssembleError> {
    if pages.is_empty() {
        return Err(AssembleError::NoPages);
    }

    let encoder = encoder_for(format);
    let partial = partial_path(path);
    debug!(partial = %partial.display(), "encoding document");

    if let Err(error) = encoder.encode(pages, title, &partial) {
        let _ = std::fs::remove_file(&partial);
        return Err(error);
    }

    std::fs::rename(&partial, path).map_err(|e| {
        let _ = std::fs::remove_file(&partial);
        AssembleError::io(path, e)
    })?;

    info!(format = encoder.extension(), "document written");
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Re-encodes a page as baseline RGB JPEG, returning bytes and dimensions.
pub(crate) fn encode_jpeg(page: &PageImage) -> Result<(Vec<u8>, u32, u32), AssembleError> {
    let rgb = page.image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode(&rgb, width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| AssembleError::image(page.page, e))?;

    Ok((out.into_inner(), width, height))
}

#[cfg(test)]
pub(crate) mod test_pages {
    use image::{DynamicImage, Rgb, RgbImage};

    use super::PageImage;

    /// Solid-colour page whose width encodes its page number.
    pub(crate) fn page(page: u32) -> PageImage {
        let width = 10 * page;
        let shade = u8::try_from((page * 40) % 256).unwrap_or(0);
        let image = RgbImage::from_pixel(width, 12, Rgb([shade, 255 - shade, 128]));
        PageImage {
            page,
            image: DynamicImage::ImageRgb8(image),
        }
    }
}

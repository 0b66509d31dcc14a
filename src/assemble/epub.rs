//! EPUB output: one fixed-size XHTML page per image.

use std::io::Cursor;
use std::path::Path;

use epub_builder::{EpubBuilder, EpubContent, EpubVersion, ZipLibrary};
use tracing::debug;

use super::{AssembleError, DocumentEncoder, PageImage, encode_jpeg};

/// Builds an EPUB 3 book whose spine is the page images in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpubEncoder;

impl DocumentEncoder for EpubEncoder {
    fn extension(&self) -> &'static str {
        "epub"
    }

    fn encode(&self, pages: &[PageImage], title: &str, path: &Path) -> Result<(), AssembleError> {
        let zip = ZipLibrary::new().map_err(AssembleError::epub)?;
        let mut builder = EpubBuilder::new(zip).map_err(AssembleError::epub)?;
        builder.epub_version(EpubVersion::V30);
        builder
            .metadata("title", title)
            .map_err(AssembleError::epub)?;
        builder
            .metadata("toc_name", title)
            .map_err(AssembleError::epub)?;

        for page in pages {
            let (jpeg, width, height) = encode_jpeg(page)?;
            let image_path = format!("images/{:03}.jpg", page.page);

            builder
                .add_resource(&image_path, Cursor::new(jpeg), "image/jpeg")
                .map_err(AssembleError::epub)?;

            let xhtml = page_xhtml(page.page, &image_path, width, height);
            builder
                .add_content(
                    EpubContent::new(format!("page{:03}.xhtml", page.page), xhtml.as_bytes())
                        .title(format!("Page {}", page.page)),
                )
                .map_err(AssembleError::epub)?;
            debug!(page = page.page, "page added to EPUB");
        }

        let mut buffer = Vec::new();
        builder
            .generate(&mut buffer)
            .map_err(AssembleError::epub)?;
        std::fs::write(path, buffer).map_err(|e| AssembleError::io(path, e))
    }
}

fn page_xhtml(page: u32, image_path: &str, width: u32, height: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
<title>Page {page}</title>
<meta name="viewport" content="width={width}, height={height}"/>
<style>body {{ margin: 0; padding: 0; }} img {{ display: block; max-width: 100%; max-height: 100%; margin: 0 auto; }}</style>
</head>
<body>
<img src="{image_path}" alt="Page {page}" width="{width}" height="{height}"/>
</body>
</html>
"#
    )
}

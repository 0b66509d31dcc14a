//! PDF output: one page per image, sized to the image.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use tracing::debug;

use super::{AssembleError, DocumentEncoder, PageImage, encode_jpeg};

const IMAGE_NAME: &[u8] = b"Im0";

/// Writes each page as a full-bleed JPEG on a page of the same pixel size.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfEncoder;

impl DocumentEncoder for PdfEncoder {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn encode(&self, pages: &[PageImage], title: &str, path: &Path) -> Result<(), AssembleError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

        for page in pages {
            let (jpeg, width, height) = encode_jpeg(page)?;
            let (width, height) = (i64::from(width), i64::from(height));

            let image = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                jpeg,
            );
            let image_id = doc.add_object(image);

            let content = Content {
                operations: vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![
                            Object::Integer(width),
                            Object::Integer(0),
                            Object::Integer(0),
                            Object::Integer(height),
                            Object::Integer(0),
                            Object::Integer(0),
                        ],
                    ),
                    Operation::new("Do", vec![Object::Name(IMAGE_NAME.to_vec())]),
                    Operation::new("Q", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().map_err(AssembleError::pdf)?,
            ));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "XObject" => dictionary! {
                        "Im0" => image_id,
                    },
                },
            });
            kids.push(page_id.into());
            debug!(page = page.page, width, height, "page added to PDF");
        }

        let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
            "Producer" => Object::string_literal("book-saver"),
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        doc.save(path).map_err(AssembleError::pdf)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::assemble::test_pages::page;
    use tempfile::TempDir;

    fn media_box_width(doc: &Document, page_id: lopdf::ObjectId) -> i64 {
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        media_box[2].as_i64().unwrap()
    }

    #[test]
    fn test_pdf_has_one_page_per_image_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("book_1-3.pdf");

        PdfEncoder
            .encode(&[page(1), page(2), page(3)], "book_1-3", &target)
            .unwrap();

        let doc = Document::load(&target).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 3);

        let widths: Vec<i64> = pages
            .values()
            .map(|id| media_box_width(&doc, *id))
            .collect();
        assert_eq!(widths, vec![10, 20, 30]);
    }

    #[test]
    fn test_pdf_page_size_matches_image() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("single.pdf");

        PdfEncoder.encode(&[page(4)], "single", &target).unwrap();

        let doc = Document::load(&target).unwrap();
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        let dims: Vec<i64> = media_box.iter().map(|v| v.as_i64().unwrap()).collect();
        assert_eq!(dims, vec![0, 0, 40, 12]);
    }
}

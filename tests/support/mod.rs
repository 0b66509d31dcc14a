//! Shared helpers for integration tests: mock servers and page fixtures.

#![allow(dead_code)]

pub mod socket_guard;

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

/// Path of a full-size page image below the book root.
pub fn page_path(book: &str, page: u32) -> String {
    format!("/{book}/content/pages/page{page}.jpg")
}

/// Encodes a small solid image; width grows with the page number so page
/// order can be checked after assembly.
pub fn page_bytes(page: u32, format: ImageFormat) -> Vec<u8> {
    let shade = u8::try_from(page * 20 % 256).expect("shade fits in u8");
    let image = RgbImage::from_pixel(10 * page, 14, Rgb([shade, 90, 160]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, format)
        .expect("encode fixture page");
    buffer.into_inner()
}

/// Serves JPEG pages `1..=last` of `book`; anything else gets the server's 404.
pub async fn mount_pages(server: &MockServer, book: &str, last: u32) {
    for page in 1..=last {
        Mock::given(method("GET"))
            .and(path(page_path(book, page)))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(page_bytes(page, ImageFormat::Jpeg)),
            )
            .mount(server)
            .await;
    }
}

/// `pages.xml` body listing `pages` entries.
pub fn manifest_xml(pages: u32) -> String {
    let entries: String = (1..=pages)
        .map(|n| format!("  <page src=\"content/pages/page{n}.jpg\"/>\n"))
        .collect();
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<pages>\n{entries}</pages>\n")
}

/// Responder that fails the first `fail_count` requests with 500, then returns 200 with body.
pub struct FlakyResponder {
    request_count: Arc<AtomicUsize>,
    fail_count: usize,
    success_body: Vec<u8>,
}

impl FlakyResponder {
    pub fn new(fail_count: usize, success_body: Vec<u8>) -> (Self, Arc<AtomicUsize>) {
        let request_count = Arc::new(AtomicUsize::new(0));
        let responder = Self {
            request_count: Arc::clone(&request_count),
            fail_count,
            success_body,
        };
        (responder, request_count)
    }
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let n = self.request_count.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_count {
            ResponseTemplate::new(500).set_body_bytes(b"internal server error".to_vec())
        } else {
            ResponseTemplate::new(200).set_body_bytes(self.success_body.clone())
        }
    }
}

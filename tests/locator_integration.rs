//! Integration tests for book root normalization and output naming.

use book_saver_core::job::{DownloadJob, OutputMode, PageRange};
use book_saver_core::locator::normalize;
use book_saver_core::manifest::PageCount;

const REFERENCES: &[&str] = &[
    "https://h.example/b/book1/content/medium/page5.jpg",
    "https://h.example/b/book1/content/medium/page5.jpg?v=3#top",
    "https://h.example/b/book1/index.html",
    "https://h.example/b/book1/index.html?from=search",
    "https://h.example/b/book1/",
    "https://h.example/b/book1",
    "https://h.example/b/book1/content/pages/page12.jpg",
    "  https://h.example/b/book1/  ",
    "https://h.example/",
];

#[test]
fn test_normalize_is_idempotent_for_directory_roots() {
    for reference in REFERENCES {
        let once = normalize(reference);
        let twice = normalize(once.as_str());
        assert_eq!(once, twice, "re-normalizing {reference:?} changed the root");
    }
}

#[test]
fn test_all_reference_shapes_agree_on_the_book() {
    let expected = normalize("https://h.example/b/book1");
    for reference in [
        "https://h.example/b/book1/content/medium/page5.jpg?v=3#top",
        "https://h.example/b/book1/index.html",
        "https://h.example/b/book1/",
    ] {
        let root = normalize(reference);
        assert_eq!(root, expected, "reference {reference:?}");
        assert_eq!(root.identifier(), "book1");
    }
}

#[test]
fn test_medium_asset_strips_to_book_root() {
    let root = normalize("https://h/b/book1/content/medium/page5.jpg");
    assert_eq!(root.as_str(), "https://h/b/book1");
    assert_eq!(root.identifier(), "book1");
}

#[test]
fn test_bare_file_strips_to_book_root() {
    let root = normalize("https://h/b/book1/index.html");
    assert_eq!(root.as_str(), "https://h/b/book1");
}

#[test]
fn test_directory_passes_through_without_trailing_slash() {
    let root = normalize("https://h/b/book1/");
    assert_eq!(root.as_str(), "https://h/b/book1");
    assert_eq!(root.identifier(), "book1");
}

#[test]
fn test_page_urls_are_built_from_the_root() {
    let root = normalize("https://h/b/book1/content/medium/page5.jpg?x=1");
    assert_eq!(root.page_url(7), "https://h/b/book1/content/pages/page7.jpg");
    assert_eq!(root.join("data/pages.xml"), "https://h/b/book1/data/pages.xml");
}

#[test]
fn test_garbage_reference_is_returned_trimmed() {
    let root = normalize("  not a url at all  ");
    assert_eq!(root.as_str(), "not a url at all");
}

#[test]
fn test_job_paths_follow_output_name() {
    let root = normalize("https://h/b/book1/index.html");
    let range = PageRange::new(1, 12).expect("valid range");

    let full = DownloadJob::new(
        root.clone(),
        range,
        PageCount::Known(12),
        OutputMode::default(),
        "/out",
    );
    assert_eq!(full.output_name(), "book1_full");
    assert_eq!(
        full.document_path().expect("document mode").to_string_lossy(),
        "/out/book1_full.pdf"
    );

    let partial = DownloadJob::new(root, range, PageCount::Unknown, OutputMode::Images, "/out");
    assert_eq!(partial.output_name(), "book1_1-12");
    assert_eq!(partial.pages_dir().to_string_lossy(), "/out/book1_1-12");
    assert!(partial.document_path().is_none());
}

#[test]
fn test_non_ascii_book_gets_readable_output_name() {
    let root = normalize("https://h/lib/Книга/index.html");
    let range = PageRange::new(2, 4).expect("valid range");
    let job = DownloadJob::new(root, range, PageCount::Unknown, OutputMode::Images, "/out");
    assert_eq!(job.output_name(), "Книга_2-4");
    assert_eq!(job.pages_dir().to_string_lossy(), "/out/Книга_2-4");
}

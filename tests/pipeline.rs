//! Offline integration tests for the extraction loop.
//!
//! A scripted generator stands in for the model: it replays canned tag
//! streams per page, so the structured path, the fallback path, document
//! assembly and file output can be checked without a server.
//!
//! Run with:
//!   cargo test --test pipeline

use edgequake_doctags::{
    convert_file, convert_image, convert_pages, convert_to_file, ConversionProgressCallback,
    DocTagsGenerator, ExtractError, ExtractionConfig, ExtractionPath, PageImage, PageSelection,
    PageSeparator, RawDocTags,
};
use image::{Rgb, RgbImage};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Canned model output ──────────────────────────────────────────────────────

const TABLE_DOCTAGS: &str = "<doctag>\
<section_header_level_1><loc_31><loc_37><loc_200><loc_60>Product Price List</section_header_level_1>\
<otsl><loc_31><loc_100><loc_406><loc_275>\
<ched>Product<ched>Price<ched>Quantity<nl>\
<fcel>Apple<fcel>$1.50<fcel>100<nl>\
<fcel>Banana<fcel>$0.75<fcel>200<nl>\
<fcel>Cherry<fcel>$3.00<fcel>50<nl>\
</otsl></doctag><end_of_utterance>";

const MIXED_DOCTAGS: &str = "<doctag>\
<title><loc_31><loc_25><loc_240><loc_55>Annual Report 2025</title>\
<section_header_level_1><loc_31><loc_66><loc_200><loc_90>Executive Summary</section_header_level_1>\
<text><loc_31><loc_100><loc_450><loc_150>Revenue increased by 15% compared to the previous year. \
The company expanded into three new markets.</text>\
<section_header_level_1><loc_31><loc_183><loc_200><loc_207>Financial Overview</section_header_level_1>\
<otsl><loc_31><loc_225><loc_281><loc_313>\
<ched>Metric<ched>Value<nl><fcel>Revenue<fcel>$10M<nl><fcel>Profit<fcel>$2M<nl>\
</otsl></doctag><end_of_utterance>";

// Mismatched close: the parser rejects it and the page degrades to text.
const BROKEN_DOCTAGS: &str =
    "<doctag><text><loc_10><loc_10><loc_90><loc_20>The quick brown fox</title></doctag>";

// ── Scripted generator ───────────────────────────────────────────────────────

/// Replays a fixed stream per page number; unknown pages fail inference.
struct ScriptedModel {
    pages: HashMap<usize, String>,
    calls: Mutex<Vec<usize>>,
}

impl ScriptedModel {
    fn new<'a>(pages: impl IntoIterator<Item = (usize, &'a str)>) -> Self {
        Self {
            pages: pages.into_iter().map(|(n, s)| (n, s.to_string())).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

impl DocTagsGenerator for ScriptedModel {
    async fn generate(&self, page: &PageImage) -> Result<RawDocTags, ExtractError> {
        self.calls.lock().unwrap().push(page.page_num);
        match self.pages.get(&page.page_num) {
            Some(text) => Ok(RawDocTags {
                text: edgequake_doctags::model::normalize_output(text),
                input_tokens: 100,
                output_tokens: 50,
            }),
            None => Err(ExtractError::InferenceFailed {
                page: page.page_num,
                detail: "no scripted output".to_string(),
            }),
        }
    }
}

fn blank_page(page_num: usize) -> PageImage {
    PageImage {
        page_num,
        image: RgbImage::from_pixel(800, 400, Rgb([255, 255, 255])),
    }
}

fn count_present(haystack: &str, needles: &[&str]) -> usize {
    needles.iter().filter(|n| haystack.contains(*n)).count()
}

fn write_png(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(800, 600, Rgb([255, 255, 255]))
        .save(&path)
        .unwrap();
    path
}

// ── Single-page paths ────────────────────────────────────────────────────────

#[tokio::test]
async fn table_page_takes_structured_path() {
    let model = ScriptedModel::new([(1, TABLE_DOCTAGS)]);
    let config = ExtractionConfig::default();

    let page = convert_image(&model, blank_page(1).image, &config)
        .await
        .unwrap();

    assert_eq!(page.path, ExtractionPath::Structured);
    assert!(page.parse_error.is_none());
    assert!(!page.doctags.ends_with("<end_of_utterance>"));

    let lower = page.text.to_lowercase();
    assert!(lower.contains("price list"), "missing title in:\n{}", page.text);
    assert!(count_present(&lower, &["product", "price", "quantity"]) >= 2);
    assert!(count_present(&lower, &["apple", "banana", "cherry"]) >= 2);
    assert!(page.text.contains("| Product"), "expected a GFM table:\n{}", page.text);
}

#[tokio::test]
async fn mixed_page_keeps_reading_order() {
    let model = ScriptedModel::new([(1, MIXED_DOCTAGS)]);
    let page = convert_image(&model, blank_page(1).image, &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(page.path, ExtractionPath::Structured);
    let lower = page.text.to_lowercase();

    let title = lower.find("annual report").expect("title present");
    let revenue = lower.find("revenue").expect("revenue present");
    assert!(title < revenue, "title must precede body text");

    let heading = lower.find("executive summary").expect("subheading present");
    let body = lower.find("increased by 15%").expect("paragraph present");
    assert!(heading < body, "heading must precede its paragraph");

    assert!(page.text.starts_with("# Annual Report 2025"));
    assert!(page.text.contains("## Executive Summary"));
    assert!(count_present(&lower, &["metric", "value", "$10m", "$2m", "profit"]) >= 2);
}

#[tokio::test]
async fn rejected_stream_falls_back_to_plain_text() {
    let model = ScriptedModel::new([(1, BROKEN_DOCTAGS)]);
    let page = convert_image(&model, blank_page(1).image, &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(page.path, ExtractionPath::Fallback);
    assert_eq!(page.text, "The quick brown fox");
    assert!(page.parse_error.is_some());
    assert_eq!(page.doctags, BROKEN_DOCTAGS);
}

#[tokio::test]
async fn empty_stream_falls_back_to_empty_text() {
    let model = ScriptedModel::new([(1, "  <end_of_utterance>")]);
    let page = convert_image(&model, blank_page(1).image, &ExtractionConfig::default())
        .await
        .unwrap();
    assert_eq!(page.path, ExtractionPath::Fallback);
    assert!(page.text.is_empty());
}

#[tokio::test]
async fn inference_failure_is_fatal() {
    let model = ScriptedModel::new([]);
    let err = convert_image(&model, blank_page(1).image, &ExtractionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::InferenceFailed { page: 1, .. }));
}

// ── Multi-page assembly ──────────────────────────────────────────────────────

#[tokio::test]
async fn pages_are_assembled_in_order_with_separator() {
    let model = ScriptedModel::new([(1, MIXED_DOCTAGS), (2, BROKEN_DOCTAGS), (3, TABLE_DOCTAGS)]);
    let config = ExtractionConfig::builder()
        .page_separator(PageSeparator::Comment)
        .build()
        .unwrap();
    let pages = [blank_page(1), blank_page(2), blank_page(3)];

    let output = convert_pages(&model, "report.pdf", 3, &pages, &config)
        .await
        .unwrap();

    assert_eq!(model.calls(), vec![1, 2, 3]);
    assert_eq!(output.pages.len(), 3);
    assert_eq!(output.stats.total_pages, 3);
    assert_eq!(output.stats.structured_pages, 2);
    assert_eq!(output.stats.fallback_pages, 1);
    assert_eq!(output.stats.total_input_tokens, 300);
    assert_eq!(output.stats.total_output_tokens, 150);

    let md = &output.markdown;
    assert!(md.starts_with("## Page 1\n\n# Annual Report 2025"));
    assert!(md.contains("\n\n<!-- page 2 -->\n\n## Page 2\n\nThe quick brown fox"));
    assert!(md.contains("\n\n<!-- page 3 -->\n\n## Page 3\n\n"));
    let p1 = md.find("## Page 1").unwrap();
    let p2 = md.find("## Page 2").unwrap();
    let p3 = md.find("## Page 3").unwrap();
    assert!(p1 < p2 && p2 < p3);
}

#[tokio::test]
async fn failing_page_aborts_the_document() {
    let model = ScriptedModel::new([(1, TABLE_DOCTAGS)]);
    let pages = [blank_page(1), blank_page(2), blank_page(3)];
    let err = convert_pages(&model, "doc.pdf", 3, &pages, &ExtractionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::InferenceFailed { page: 2, .. }));
    // Page 3 is never attempted.
    assert_eq!(model.calls(), vec![1, 2]);
}

// ── Progress callback ────────────────────────────────────────────────────────

#[derive(Default)]
struct CountingCallback {
    started: AtomicUsize,
    completed: AtomicUsize,
    fallbacks_seen: AtomicUsize,
    documents: AtomicUsize,
    reported_fallbacks: AtomicUsize,
}

impl ConversionProgressCallback for CountingCallback {
    fn on_document_start(&self, _source: &str, _total_pages: usize) {
        self.documents.fetch_add(1, Ordering::SeqCst);
    }

    fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_page_complete(&self, _page: usize, _total: usize, path: ExtractionPath, _len: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        if path == ExtractionPath::Fallback {
            self.fallbacks_seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_document_complete(&self, _total_pages: usize, fallback_count: usize) {
        self.reported_fallbacks
            .store(fallback_count, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn progress_callback_sees_every_page() {
    let cb = Arc::new(CountingCallback::default());
    let config = ExtractionConfig::builder()
        .progress_callback(cb.clone())
        .build()
        .unwrap();
    let model = ScriptedModel::new([(1, TABLE_DOCTAGS), (2, BROKEN_DOCTAGS)]);

    convert_pages(&model, "doc.pdf", 2, &[blank_page(1), blank_page(2)], &config)
        .await
        .unwrap();

    assert_eq!(cb.documents.load(Ordering::SeqCst), 1);
    assert_eq!(cb.started.load(Ordering::SeqCst), 2);
    assert_eq!(cb.completed.load(Ordering::SeqCst), 2);
    assert_eq!(cb.fallbacks_seen.load(Ordering::SeqCst), 1);
    assert_eq!(cb.reported_fallbacks.load(Ordering::SeqCst), 1);
}

// ── Files on disk ────────────────────────────────────────────────────────────

#[tokio::test]
async fn png_file_is_one_page() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_png(dir.path(), "mixed_content.png");
    let model = ScriptedModel::new([(1, MIXED_DOCTAGS)]);

    let output = convert_file(&model, &png, &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(output.source, png);
    assert_eq!(output.stats.total_pages, 1);
    assert_eq!(output.pages.len(), 1);
    assert!(output.markdown.contains("Annual Report 2025"));
}

#[tokio::test]
async fn png_rejects_selection_beyond_page_one() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_png(dir.path(), "scan.png");
    let model = ScriptedModel::new([(1, MIXED_DOCTAGS)]);
    let config = ExtractionConfig::builder()
        .pages(PageSelection::Single(2))
        .build()
        .unwrap();

    let err = convert_file(&model, &png, &config).await.unwrap_err();
    assert!(matches!(err, ExtractError::PageOutOfRange { total: 1 }));
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn missing_file_is_reported_before_inference() {
    let model = ScriptedModel::new([(1, TABLE_DOCTAGS)]);
    let err = convert_file(&model, "/nonexistent/doc.pdf", &ExtractionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::FileNotFound { .. }));
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn convert_to_file_writes_markdown() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_png(dir.path(), "table_doc.png");
    let out = dir.path().join("out").join("table_doc.md");
    let model = ScriptedModel::new([(1, TABLE_DOCTAGS)]);
    let config = ExtractionConfig::builder()
        .page_headings(false)
        .build()
        .unwrap();

    let output = convert_to_file(&model, &png, &out, &config).await.unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written, output.markdown);
    assert!(written.starts_with("## Product Price List"));
}

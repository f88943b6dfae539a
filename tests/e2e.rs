//! End-to-end tests against a live SmolDocling server.
//!
//! The fixture images are drawn by `edgequake_doctags::fixtures` into
//! `tests/fixtures/images/` on first use. Every test makes real inference
//! calls, so the suite is gated behind `E2E_ENABLED`.
//!
//! Run with:
//!   E2E_ENABLED=1 OPENAI_API_KEY=local OPENAI_BASE_URL=http://localhost:8000/v1 \
//!     cargo test --features fixtures --test e2e -- --nocapture
#![cfg(feature = "fixtures")]

use edgequake_doctags::fixtures::{self, MIXED_CONTENT, SIMPLE_TEXT, TABLE_DOC};
use edgequake_doctags::{
    convert_file, convert_to_file, DocTagsModel, ExtractError, ExtractionConfig, ExtractionPath,
};
use std::path::PathBuf;
use std::sync::OnceLock;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/images")
}

/// Draw the fixtures once per test binary. `None` when no font is available.
fn fixture(name: &str) -> Option<PathBuf> {
    static READY: OnceLock<bool> = OnceLock::new();
    let ready = *READY.get_or_init(|| {
        let dir = fixtures_dir();
        let complete = [SIMPLE_TEXT, TABLE_DOC, MIXED_CONTENT]
            .iter()
            .all(|n| dir.join(n).exists());
        if complete {
            return true;
        }
        match fixtures::generate_all(&dir) {
            Ok(_) => true,
            Err(e) => {
                println!("SKIP: cannot draw fixtures: {e}");
                false
            }
        }
    });
    ready.then(|| fixtures_dir().join(name))
}

/// Skip unless E2E_ENABLED is set and the fixture exists.
macro_rules! e2e_skip_unless_ready {
    ($name:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        match fixture($name) {
            Some(p) => p,
            None => return,
        }
    }};
}

fn load_model(config: &ExtractionConfig) -> DocTagsModel {
    DocTagsModel::load(config).expect("model provider configured (see OPENAI_BASE_URL)")
}

fn count_present(haystack: &str, needles: &[&str]) -> usize {
    needles.iter().filter(|n| haystack.contains(*n)).count()
}

fn single_page_text(config: &ExtractionConfig) -> ExtractionConfig {
    let mut c = config.clone();
    c.page_headings = false;
    c
}

// ── Fixture scenarios ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_simple_text() {
    let path = e2e_skip_unless_ready!(SIMPLE_TEXT);
    let config = single_page_text(&ExtractionConfig::default());
    let model = load_model(&config);

    let output = convert_file(&model, &path, &config).await.unwrap();
    let page = &output.pages[0];
    println!("[simple] path={} doctags:\n{}\n", page.path, page.doctags);

    let lower = output.markdown.to_lowercase();
    assert!(!lower.trim().is_empty(), "empty output");
    let found = count_present(
        &lower,
        &["quick brown fox", "simple text", "programming language"],
    );
    assert!(found >= 1, "no expected phrase in:\n{}", output.markdown);

    let sentences = output
        .markdown
        .split(|c| c == '.' || c == '\n')
        .filter(|s| s.trim().len() > 10)
        .count();
    assert!(sentences >= 2, "expected at least two sentences:\n{}", output.markdown);
}

#[tokio::test]
async fn test_table_document() {
    let path = e2e_skip_unless_ready!(TABLE_DOC);
    let config = single_page_text(&ExtractionConfig::default());
    let model = load_model(&config);

    let output = convert_file(&model, &path, &config).await.unwrap();
    println!("[table] {}:\n{}\n", output.pages[0].path, output.markdown);

    let lower = output.markdown.to_lowercase();
    assert!(lower.contains("price list"), "missing title");
    assert!(
        count_present(&lower, &["product", "price", "quantity"]) >= 2,
        "missing header cells"
    );
    assert!(
        count_present(&lower, &["apple", "banana", "cherry"]) >= 2,
        "missing product rows"
    );
}

#[tokio::test]
async fn test_mixed_content() {
    let path = e2e_skip_unless_ready!(MIXED_CONTENT);
    let config = single_page_text(&ExtractionConfig::default());
    let model = load_model(&config);

    let output = convert_file(&model, &path, &config).await.unwrap();
    println!("[mixed] {}:\n{}\n", output.pages[0].path, output.markdown);

    let lower = output.markdown.to_lowercase();
    let title = lower.find("annual report").expect("title present");
    let revenue = lower.find("revenue").expect("revenue present");
    assert!(title < revenue, "title must precede body");

    assert!(
        count_present(&lower, &["executive summary", "financial overview"]) >= 1,
        "no subheading"
    );
    assert!(
        count_present(&lower, &["increased by 15%", "three new markets", "previous year"]) >= 1,
        "no paragraph text"
    );
    assert!(
        count_present(&lower, &["revenue", "profit", "$10m", "$2m", "metric", "value"]) >= 2,
        "table values missing"
    );
}

// ── Output handling ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_output_written_to_directory() {
    let path = e2e_skip_unless_ready!(TABLE_DOC);
    let config = ExtractionConfig::default();
    let model = load_model(&config);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("table_doc.md");
    let output = convert_to_file(&model, &path, &out, &config).await.unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written, output.markdown);
    assert!(written.starts_with("## Page 1\n\n"));
}

#[tokio::test]
async fn test_every_page_reports_one_path() {
    let path = e2e_skip_unless_ready!(MIXED_CONTENT);
    let config = ExtractionConfig::default();
    let model = load_model(&config);

    let output = convert_file(&model, &path, &config).await.unwrap();
    assert_eq!(output.stats.processed_pages, 1);
    assert_eq!(
        output.stats.structured_pages + output.stats.fallback_pages,
        output.stats.processed_pages
    );
    let page = &output.pages[0];
    assert_eq!(page.parse_error.is_some(), page.path == ExtractionPath::Fallback);
    assert!(page.output_tokens > 0 || !page.doctags.is_empty());

    let json = serde_json::to_string(&output).unwrap();
    assert!(json.contains("\"path\""));
}

#[tokio::test]
async fn test_missing_file() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let config = ExtractionConfig::default();
    let model = load_model(&config);
    let err = convert_file(&model, fixtures_dir().join("does_not_exist.png"), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::FileNotFound { .. }));
}

//! Extraction entry points: the per-page loop and document assembly.
//!
//! Pages are handled strictly one after another. For each page the model
//! produces a tag stream, the stream is parsed, and exactly one of two things
//! happens: the parsed document is exported to Markdown, or the parse error
//! is logged and the raw stream is stripped to plain text. Every other error
//! is fatal for the document and returned to the caller.

use crate::config::ExtractionConfig;
use crate::doctags::{DocTagsDocument, StructuredDocument};
use crate::error::{DocTagsParseError, ExtractError};
use crate::model::DocTagsGenerator;
use crate::output::{ConversionOutput, ConversionStats, ExtractionPath, PageResult};
use crate::pipeline::fallback::strip_tags;
use crate::pipeline::render::PageImage;
use crate::pipeline::{input, render};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of parsing one tag stream.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Parsed(StructuredDocument),
    /// The grammar was violated; the raw stream is kept for the fallback.
    Unparsed {
        doctags: String,
        error: DocTagsParseError,
    },
}

/// Parse a single page's tag stream, paired with the image it describes.
///
/// Never fails: grammar errors are returned as [`ParseOutcome::Unparsed`].
pub fn parse_doctags(doctags: &str, image: Option<&RgbImage>) -> ParseOutcome {
    let pairs = DocTagsDocument::from_doctags_and_image_pairs([(doctags, image)]);
    match StructuredDocument::load_from_doctags(&pairs, "doc") {
        Ok(doc) => ParseOutcome::Parsed(doc),
        Err(error) => ParseOutcome::Unparsed {
            doctags: doctags.to_string(),
            error,
        },
    }
}

/// Run one page through inference, parsing and export (or fallback).
pub async fn extract_page<G: DocTagsGenerator>(
    model: &G,
    page: &PageImage,
    config: &ExtractionConfig,
) -> Result<PageResult, ExtractError> {
    let start = Instant::now();
    let raw = model.generate(page).await?;

    let (text, path, parse_error) = match parse_doctags(&raw.text, Some(&page.image)) {
        ParseOutcome::Parsed(doc) => (
            doc.export_to_markdown_with(&config.markdown),
            ExtractionPath::Structured,
            None,
        ),
        ParseOutcome::Unparsed { doctags, error } => {
            warn!(
                "Page {}: DocTags rejected ({}); falling back to plain text",
                page.page_num, error
            );
            (strip_tags(&doctags), ExtractionPath::Fallback, Some(error.to_string()))
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    debug!(
        "Page {}: {} path, {} chars, {}ms",
        page.page_num,
        path,
        text.len(),
        duration_ms
    );

    Ok(PageResult {
        page_num: page.page_num,
        text,
        path,
        doctags: raw.text,
        parse_error,
        input_tokens: raw.input_tokens,
        output_tokens: raw.output_tokens,
        duration_ms,
    })
}

/// Extract an already loaded image as page 1.
pub async fn convert_image<G: DocTagsGenerator>(
    model: &G,
    image: RgbImage,
    config: &ExtractionConfig,
) -> Result<PageResult, ExtractError> {
    let page = PageImage { page_num: 1, image };
    extract_page(model, &page, config).await
}

/// Extract a sequence of page images and assemble the document.
///
/// `total_pages` is the page count of the source, which may exceed
/// `pages.len()` when a page selection was applied.
pub async fn convert_pages<G: DocTagsGenerator>(
    model: &G,
    source: impl Into<PathBuf>,
    total_pages: usize,
    pages: &[PageImage],
    config: &ExtractionConfig,
) -> Result<ConversionOutput, ExtractError> {
    let start = Instant::now();
    let source = source.into();
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string());
    let selected = pages.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_start(&name, selected);
    }

    let mut results = Vec::with_capacity(selected);
    for page in pages {
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page.page_num, selected);
        }

        let result = extract_page(model, page, config).await?;

        if let Some(ref cb) = config.progress_callback {
            cb.on_page_complete(page.page_num, selected, result.path, result.text.len());
        }
        results.push(result);
    }

    let fallback_pages = results
        .iter()
        .filter(|p| p.path == ExtractionPath::Fallback)
        .count();

    let stats = ConversionStats {
        total_pages,
        processed_pages: results.len(),
        structured_pages: results.len() - fallback_pages,
        fallback_pages,
        total_input_tokens: results.iter().map(|p| p.input_tokens as u64).sum(),
        total_output_tokens: results.iter().map(|p| p.output_tokens as u64).sum(),
        total_duration_ms: start.elapsed().as_millis() as u64,
        render_duration_ms: 0,
        inference_duration_ms: results.iter().map(|p| p.duration_ms).sum(),
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_complete(results.len(), fallback_pages);
    }

    info!(
        "{}: {} pages ({} structured, {} fallback), {}ms",
        name, stats.processed_pages, stats.structured_pages, stats.fallback_pages, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        source,
        markdown: assemble_document(&results, config),
        pages: results,
        stats,
    })
}

/// Extract a PDF or image file.
///
/// # Errors
/// Any [`ExtractError`]: unreadable input, rendering failure, or a failed
/// inference call. A page whose tag stream does not parse is not an error.
pub async fn convert_file<G: DocTagsGenerator>(
    model: &G,
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ConversionOutput, ExtractError> {
    let total_start = Instant::now();
    let path = path.as_ref();
    info!("Starting extraction: {}", path.display());

    let source = input::resolve_source(path)?;

    let render_start = Instant::now();
    let rendered = render::render_source(&source, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Prepared {} page image(s) in {}ms",
        rendered.pages.len(),
        render_duration_ms
    );

    let mut output = convert_pages(
        model,
        source.path.clone(),
        rendered.total_pages,
        &rendered.pages,
        config,
    )
    .await?;
    output.stats.render_duration_ms = render_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Where `{stem}.md` for `input` lands inside `output_dir`.
pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{stem}.md"))
}

/// Extract a file and write the assembled Markdown to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file<G: DocTagsGenerator>(
    model: &G,
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ConversionOutput, ExtractError> {
    let output = convert_file(model, input_path, config).await?;
    write_markdown(output_path.as_ref(), &output.markdown).await?;
    Ok(output)
}

/// Atomically write `markdown` to `path`, creating parent directories.
pub async fn write_markdown(path: &Path, markdown: &str) -> Result<(), ExtractError> {
    let write_err = |source| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    debug!("Wrote {}", path.display());
    Ok(())
}

/// Join page sections with the configured separator.
pub fn assemble_document(pages: &[PageResult], config: &ExtractionConfig) -> String {
    let mut out = String::new();

    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            out.push_str(&config.page_separator.render(page.page_num));
        }
        if config.page_headings {
            out.push_str(&format!("## Page {}\n\n", page.page_num));
        }
        out.push_str(&page.text);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSeparator;

    fn page(n: usize, text: &str) -> PageResult {
        PageResult {
            page_num: n,
            text: text.to_string(),
            path: ExtractionPath::Structured,
            doctags: String::new(),
            parse_error: None,
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
        }
    }

    #[test]
    fn parse_outcome_is_discriminated() {
        assert!(matches!(
            parse_doctags("<doctag><title>Hi</title></doctag>", None),
            ParseOutcome::Parsed(_)
        ));
        match parse_doctags("<doctag><text>broken</title></doctag>", None) {
            ParseOutcome::Unparsed { doctags, error } => {
                assert!(doctags.contains("broken"));
                assert!(matches!(error, DocTagsParseError::MismatchedClosingTag { .. }));
            }
            ParseOutcome::Parsed(_) => panic!("expected a parse failure"),
        }
    }

    #[test]
    fn assemble_with_headings_and_rule() {
        let config = ExtractionConfig::default();
        let doc = assemble_document(&[page(1, "one"), page(2, "two")], &config);
        assert_eq!(doc, "## Page 1\n\none\n\n---\n\n## Page 2\n\ntwo");
    }

    #[test]
    fn assemble_without_headings() {
        let config = ExtractionConfig::builder()
            .page_headings(false)
            .page_separator(PageSeparator::Comment)
            .build()
            .unwrap();
        let doc = assemble_document(&[page(1, "one"), page(3, "three")], &config);
        assert_eq!(doc, "one\n\n<!-- page 3 -->\n\nthree");
    }

    #[test]
    fn assemble_single_page_has_no_separator() {
        let doc = assemble_document(&[page(1, "only")], &ExtractionConfig::default());
        assert_eq!(doc, "## Page 1\n\nonly");
    }

    #[test]
    fn output_path_uses_stem() {
        assert_eq!(
            output_path_for(Path::new("/data/report.pdf"), Path::new("out")),
            PathBuf::from("out/report.md")
        );
    }

    #[tokio::test]
    async fn write_markdown_is_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.md");
        write_markdown(&path, "# Title").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Title");
        assert!(!path.with_extension("md.tmp").exists());
    }
}

//! # edgequake-doctags
//!
//! Run the SmolDocling document-understanding model on PDFs and page images,
//! parse the DocTags it emits, and export Markdown.
//!
//! SmolDocling reads a page image and answers with a tag stream describing
//! titles, paragraphs, tables, lists and pictures together with their
//! positions. This crate parses that stream natively into a structured
//! document and renders it as Markdown. When the model produces a stream the
//! parser rejects, the page still yields text: the markup is stripped and the
//! words are kept.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / PNG / JPEG
//!  │
//!  ├─ 1. Input    classify by magic bytes
//!  ├─ 2. Render   rasterise pages via pdfium (spawn_blocking), or decode the image
//!  ├─ 3. Model    one request per page: image + "Convert this page to docling."
//!  ├─ 4. Parse    DocTags → StructuredDocument
//!  ├─ 5. Export   StructuredDocument → Markdown
//!  │     └─ on parse error: strip tags → plain text
//!  └─ 6. Output   `## Page N` sections joined by a separator + per-page stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doctags::{convert_file, DocTagsModel, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // SmolDocling behind an OpenAI-compatible server:
//!     // OPENAI_API_KEY=... OPENAI_BASE_URL=http://localhost:8000/v1
//!     let config = ExtractionConfig::default();
//!     let model = DocTagsModel::load(&config)?;
//!     let output = convert_file(&model, "document.pdf", &config).await?;
//!     println!("{}", output.markdown);
//!     eprintln!(
//!         "{} structured / {} fallback pages",
//!         output.stats.structured_pages, output.stats.fallback_pages
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Parsing DocTags without a model
//!
//! ```rust
//! use edgequake_doctags::doctags::{DocTagsDocument, StructuredDocument};
//!
//! let doctags = "<doctag><title>Annual Report 2025</title><text>Revenue grew.</text></doctag>";
//! let pairs = DocTagsDocument::from_doctags_and_image_pairs([(doctags, None)]);
//! let doc = StructuredDocument::load_from_doctags(&pairs, "report").unwrap();
//! assert_eq!(doc.export_to_markdown(), "# Annual Report 2025\n\nRevenue grew.");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature    | Default | Description |
//! |------------|---------|-------------|
//! | `cli`      | on      | Enables the `doctags2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `fixtures` | off     | Enables [`fixtures`] (imageproc + ab_glyph); with `cli`, the `gen-fixtures` binary |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod doctags;
pub mod error;
#[cfg(feature = "fixtures")]
pub mod fixtures;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ExtractionConfig, ExtractionConfigBuilder, PageSelection, PageSeparator, DEFAULT_MODEL_ID,
};
pub use convert::{
    assemble_document, convert_file, convert_image, convert_pages, convert_to_file, extract_page,
    output_path_for, parse_doctags, write_markdown, ParseOutcome,
};
pub use doctags::{MarkdownOptions, StructuredDocument};
pub use error::{DocTagsParseError, ExtractError};
pub use model::{DocTagsGenerator, DocTagsModel, RawDocTags};
pub use output::{ConversionOutput, ConversionStats, ExtractionPath, PageResult};
pub use pipeline::fallback::strip_tags;
pub use pipeline::render::PageImage;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};

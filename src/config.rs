//! Configuration types for DocTags extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. One struct carries every knob, from
//! rasterisation DPI to the provider that hosts the model, so a run can be
//! logged and reproduced from its config alone.

use crate::doctags::MarkdownOptions;
use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Hugging Face identifier of the model the prompt and tag vocabulary target.
pub const DEFAULT_MODEL_ID: &str = "ds4sd/SmolDocling-256M-preview";

/// Configuration for a DocTags extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_doctags::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(150)
///     .max_tokens(4096)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–400. Default: 200.
    pub dpi: u32,

    /// Optional cap on the longest rendered edge, in pixels. Default: None.
    ///
    /// Without a cap every page renders at exactly `dpi`. With one, pages
    /// whose longest edge would exceed it are scaled down proportionally.
    pub max_rendered_pixels: Option<u32>,

    /// Model identifier sent to the provider. Default: [`DEFAULT_MODEL_ID`].
    pub model: String,

    /// Provider name (e.g. "openai", "ollama", "lmstudio").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Maximum tokens the model may generate per page. Default: 8192.
    ///
    /// A dense page of DocTags (every element carries four location tokens)
    /// runs to a few thousand tokens.
    pub max_tokens: usize,

    /// Sampling temperature. Default: 0.0 (greedy).
    pub temperature: f32,

    /// Instruction sent alongside the page image. If None, uses
    /// [`crate::prompts::DOCTAGS_PROMPT`].
    pub prompt: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Separator between page sections in assembled output. Default: horizontal rule.
    pub page_separator: PageSeparator,

    /// Prefix each page section with a `## Page N` heading. Default: true.
    pub page_headings: bool,

    /// Markdown export options for the structured path.
    pub markdown: MarkdownOptions,

    /// Optional progress callback. Receives per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: None,
            model: DEFAULT_MODEL_ID.to_string(),
            provider_name: None,
            provider: None,
            max_tokens: 8192,
            temperature: 0.0,
            prompt: None,
            pages: PageSelection::default(),
            page_separator: PageSeparator::default(),
            page_headings: true,
            markdown: MarkdownOptions::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("pages", &self.pages)
            .field("page_separator", &self.page_separator)
            .field("page_headings", &self.page_headings)
            .field("markdown", &self.markdown)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = Some(px.max(100));
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn page_headings(mut self, v: bool) -> Self {
        self.config.page_headings = v;
        self
    }

    pub fn markdown(mut self, options: MarkdownOptions) -> Self {
        self.config.markdown = options;
        self
    }

    /// Attach a progress callback to receive per-page events.
    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ExtractError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "model identifier must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of a PDF to extract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Extract all pages (default).
    #[default]
    All,
    /// Extract a single page (1-indexed).
    Single(usize),
    /// Extract a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Extract specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// How to separate page sections in the assembled output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// No separator; sections joined with "\n\n".
    None,
    /// Horizontal rule: "\n\n---\n\n" (default)
    #[default]
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator placed before the section of `page_num` (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}

//! Result types returned by the extraction entry points.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which branch produced a page's text.
///
/// Exactly one branch runs per page: the structured path when the tag
/// stream parses, the fallback path when it does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPath {
    /// Tag stream parsed into a document and exported to Markdown.
    Structured,
    /// Tag stream rejected by the parser; markup stripped to plain text.
    Fallback,
}

impl fmt::Display for ExtractionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionPath::Structured => f.write_str("structured"),
            ExtractionPath::Fallback => f.write_str("fallback"),
        }
    }
}

/// Output of one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number within the source document.
    pub page_num: usize,
    /// Markdown (structured path) or plain text (fallback path).
    pub text: String,
    /// Branch that produced `text`.
    pub path: ExtractionPath,
    /// Raw tag stream as returned by the model.
    pub doctags: String,
    /// Parser message when `path` is [`ExtractionPath::Fallback`].
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parse_error: Option<String>,
    /// Prompt tokens reported by the provider.
    pub input_tokens: usize,
    /// Generated tokens reported by the provider.
    pub output_tokens: usize,
    /// Wall-clock time spent on inference plus conversion.
    pub duration_ms: u64,
}

/// Aggregate statistics for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the source (1 for an image file).
    pub total_pages: usize,
    /// Pages actually processed after applying the page selection.
    pub processed_pages: usize,
    /// Pages whose tag stream parsed.
    pub structured_pages: usize,
    /// Pages that degraded to plain text.
    pub fallback_pages: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
    pub inference_duration_ms: u64,
}

/// Full result of extracting one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Input path as given by the caller.
    pub source: PathBuf,
    /// Assembled document: per-page sections joined by the configured separator.
    pub markdown: String,
    /// Per-page results in page order.
    pub pages: Vec<PageResult>,
    pub stats: ConversionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_path_serialises_snake_case() {
        let json = serde_json::to_string(&ExtractionPath::Fallback).unwrap();
        assert_eq!(json, "\"fallback\"");
        assert_eq!(ExtractionPath::Structured.to_string(), "structured");
    }

    #[test]
    fn page_result_omits_missing_parse_error() {
        let page = PageResult {
            page_num: 1,
            text: "# Title".into(),
            path: ExtractionPath::Structured,
            doctags: "<doctag><title>Title</title></doctag>".into(),
            parse_error: None,
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
        };
        let json = serde_json::to_string(&page).unwrap();
        assert!(!json.contains("parse_error"));
        assert!(json.contains("\"structured\""));
    }
}

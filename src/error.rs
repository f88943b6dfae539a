//! Error types for the edgequake-doctags library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`]: **Fatal**: the page or document cannot be processed
//!   at all (missing input, unreadable PDF, model not reachable, inference
//!   failed). Returned as `Err(ExtractError)` from the `convert*` functions
//!   and never caught inside the pipeline.
//!
//! * [`DocTagsParseError`]: **Recovered**: the model answered, but its tag
//!   stream does not follow the DocTags grammar. The orchestrator catches
//!   exactly this class and degrades the page to plain text via
//!   [`crate::pipeline::fallback::strip_tags`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-doctags library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but its first bytes could not be read.
    #[error("Failed to read '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is neither a PDF nor an image format we can decode.
    #[error("Unsupported input '{path}': not a PDF, PNG or JPEG file\nFirst bytes: {magic:?}")]
    UnsupportedInput { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password; encrypted documents are not supported.
    #[error("PDF '{path}' is encrypted and requires a password.")]
    PasswordRequired { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Selected page numbers exceed the actual page count.
    #[error("No selected page is in range (document has {total} pages)")]
    PageOutOfRange { total: usize },

    // ── Image errors ──────────────────────────────────────────────────────
    /// A page image file could not be decoded.
    #[error("Failed to decode image '{path}': {source}")]
    ImageDecodeFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A page image could not be PNG-encoded for the model request.
    #[error("Failed to encode page {page} for inference: {detail}")]
    ImageEncodeFailed { page: usize, detail: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The configured provider could not be created (missing key, unknown name).
    #[error("Model provider '{provider}' is not configured.\n{hint}")]
    ModelNotConfigured { provider: String, hint: String },

    /// The single inference attempt for a page failed.
    #[error("Inference failed on page {page}: {detail}")]
    InferenceFailed { page: usize, detail: String },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium system-wide, or set PDFIUM_LIB_PATH to the library file\n\
(or the directory containing it).\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A DocTags grammar violation.
///
/// Offsets are byte offsets into the raw tag stream.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum DocTagsParseError {
    /// A tag name outside the DocTags vocabulary.
    #[error("unknown tag <{tag}> at byte {offset}")]
    UnknownTag { tag: String, offset: usize },

    /// A closing tag that does not match the innermost open element.
    #[error("expected </{expected}> but found </{found}> at byte {offset}")]
    MismatchedClosingTag {
        expected: String,
        found: String,
        offset: usize,
    },

    /// A closing tag with no open element at all.
    #[error("unexpected closing tag </{tag}> at byte {offset}")]
    UnexpectedClosingTag { tag: String, offset: usize },

    /// The stream ended while an element was still open.
    #[error("element <{tag}> opened at byte {offset} is never closed")]
    UnclosedElement { tag: String, offset: usize },

    /// A known tag appearing where the grammar does not allow it.
    #[error("tag <{tag}> is not allowed inside <{context}> (byte {offset})")]
    MisplacedTag {
        tag: String,
        context: String,
        offset: usize,
    },

    /// Non-whitespace text outside any text-bearing element.
    #[error("text outside any element at byte {offset}")]
    StrayText { offset: usize },

    /// A `<loc_N>` token outside the 0..=500 grid.
    #[error("location value {value} is outside the 0..=500 grid (byte {offset})")]
    InvalidLocation { value: u32, offset: usize },

    /// An OTSL table that cannot be resolved into a grid.
    #[error("malformed table at byte {offset}: {detail}")]
    MalformedTable { detail: String, offset: usize },

    /// The stream has no `<doctag>` root (an empty stream included).
    #[error("tag stream has no <doctag> root element")]
    MissingRoot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_found_display() {
        let e = ExtractError::FileNotFound {
            path: PathBuf::from("/tmp/missing.pdf"),
        };
        assert!(e.to_string().contains("missing.pdf"), "got: {e}");
    }

    #[test]
    fn inference_failed_display() {
        let e = ExtractError::InferenceFailed {
            page: 3,
            detail: "connection refused".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 3"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn mismatched_closing_display() {
        let e = DocTagsParseError::MismatchedClosingTag {
            expected: "text".into(),
            found: "title".into(),
            offset: 42,
        };
        let msg = e.to_string();
        assert!(msg.contains("</text>"));
        assert!(msg.contains("</title>"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn parse_error_is_serialisable() {
        let e = DocTagsParseError::InvalidLocation {
            value: 812,
            offset: 7,
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("812"));
    }
}

//! DocTags: the tag language SmolDocling emits for a page.
//!
//! ```text
//! <doctag>
//!   <title><loc_40><loc_30><loc_460><loc_60>Annual Report 2025</title>
//!   <otsl><ched>Name<ched>Score<nl><fcel>Alice<fcel>95<nl></otsl>
//! </doctag>
//! ```
//!
//! [`lexer`] splits the stream into tokens, the parser builds a
//! [`StructuredDocument`], and [`MarkdownExporter`] renders it. A stream that
//! breaks the grammar yields a [`crate::error::DocTagsParseError`]; callers
//! decide what to do with the page.

pub mod document;
pub mod lexer;
pub mod markdown;
mod otsl;
mod parser;

pub use document::{
    BoundingBox, DocItem, DocTagsDocument, DocTagsPage, ListEntry, ListGroup, PageSize,
    PictureKind, Provenance, StructuredDocument, TableCell, TableData, TextLabel, LOC_GRID,
};
pub use markdown::{MarkdownExporter, MarkdownOptions};

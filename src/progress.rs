//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator walks the pages of a document.
//!
//! Pages are processed one at a time, so events for a document always
//! arrive in page order. The trait is still `Send + Sync` because the config
//! that carries it is shared across tasks.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doctags::{ConversionProgressCallback, ExtractionConfig, ExtractionPath};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FallbackCounter {
//!     fallbacks: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for FallbackCounter {
//!     fn on_page_complete(&self, _page: usize, _total: usize, path: ExtractionPath, _len: usize) {
//!         if path == ExtractionPath::Fallback {
//!             self.fallbacks.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(FallbackCounter { fallbacks: AtomicUsize::new(0) });
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ExtractionPath;
use std::sync::Arc;

/// Called by the orchestrator as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once per document, after its pages are rendered and before the
    /// first inference call.
    ///
    /// # Arguments
    /// * `source`: display name of the input file
    /// * `total_pages`: number of pages that will be processed
    fn on_document_start(&self, source: &str, total_pages: usize) {
        let _ = (source, total_pages);
    }

    /// Called just before the model is asked for a page's tag stream.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page produced text.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed page number
    /// * `total_pages`: total pages being processed
    /// * `path`: whether the page went through the structured or fallback path
    /// * `text_len`: byte length of the produced text
    fn on_page_complete(
        &self,
        page_num: usize,
        total_pages: usize,
        path: ExtractionPath,
        text_len: usize,
    ) {
        let _ = (page_num, total_pages, path, text_len);
    }

    /// Called once after all pages of a document produced text.
    ///
    /// # Arguments
    /// * `total_pages`: pages processed
    /// * `fallback_count`: pages that degraded to plain text
    fn on_document_complete(&self, total_pages: usize, fallback_count: usize) {
        let _ = (total_pages, fallback_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

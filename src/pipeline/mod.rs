//! Pipeline stages around the model call.
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ (model) ──▶ doctags parse ──▶ markdown
//! (sniff)   (pdfium)   (base64)                    │
//!                                                  └──▶ fallback (on parse error)
//! ```
//!
//! 1. [`input`]    classify a path as PDF or page image by magic bytes
//! 2. [`render`]   rasterise selected PDF pages, or decode the image file;
//!    pdfium runs in `spawn_blocking`
//! 3. [`encode`]   PNG-encode and base64-wrap each page for the provider
//! 4. [`fallback`] strip markup from a tag stream the parser rejected

pub mod encode;
pub mod fallback;
pub mod input;
pub mod render;

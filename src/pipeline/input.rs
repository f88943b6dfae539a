//! Input resolution: classify a user-supplied path as a PDF or a page image.
//!
//! The decision is made from the first bytes of the file, never from its
//! extension, so a mislabelled `scan.pdf` that is really a PNG still works
//! and a text file named `page.png` fails early with a clear message instead
//! of a decoder error.

use crate::error::ExtractError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What kind of document a path holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Multi-page PDF, rasterised via pdfium.
    Pdf,
    /// A single page image (PNG or JPEG).
    Image(image::ImageFormat),
}

/// A local input file with its detected kind.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub path: PathBuf,
    pub kind: SourceKind,
}

/// Classify a file by its magic bytes.
pub fn sniff(magic: &[u8]) -> Option<SourceKind> {
    if magic.starts_with(b"%PDF") {
        Some(SourceKind::Pdf)
    } else if magic.starts_with(b"\x89PNG") {
        Some(SourceKind::Image(image::ImageFormat::Png))
    } else if magic.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(SourceKind::Image(image::ImageFormat::Jpeg))
    } else {
        None
    }
}

/// Resolve a local path, validating existence, readability and format.
pub fn resolve_source(path: &Path) -> Result<ResolvedSource, ExtractError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(ExtractError::FileNotFound { path });
    }

    let read_err = |source| ExtractError::InputReadFailed {
        path: path.clone(),
        source,
    };

    let mut magic = [0u8; 4];
    match std::fs::File::open(&path) {
        Ok(f) => {
            let mut head = Vec::with_capacity(4);
            // A short read leaves the tail of `magic` zeroed.
            f.take(4).read_to_end(&mut head).map_err(read_err)?;
            magic[..head.len()].copy_from_slice(&head);
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied { path: path.clone() });
        }
        Err(e) => return Err(read_err(e)),
    }

    let Some(kind) = sniff(&magic) else {
        return Err(ExtractError::UnsupportedInput { path, magic });
    };

    debug!("Resolved {} as {:?}", path.display(), kind);
    Ok(ResolvedSource { path, kind })
}

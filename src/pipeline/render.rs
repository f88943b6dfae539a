//! Page images: rasterise PDF pages via pdfium, or decode an image file.
//!
//! pdfium is a blocking C library, so all of its work happens inside
//! `tokio::task::spawn_blocking`. Pages render at exactly the requested DPI
//! unless `max_rendered_pixels` is set, in which case the longest edge is
//! capped at that many pixels.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::pipeline::input::{ResolvedSource, SourceKind};
use image::RgbImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One page ready for inference.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-indexed page number within the source document.
    pub page_num: usize,
    pub image: RgbImage,
}

/// Pages selected from one source.
#[derive(Debug)]
pub struct RenderedPages {
    /// Pages in the source (1 for an image file).
    pub total_pages: usize,
    /// Selected pages in ascending order.
    pub pages: Vec<PageImage>,
}

/// Bind to pdfium.
///
/// `PDFIUM_LIB_PATH` may name the library file or the directory holding it;
/// otherwise the system library search path is used.
pub fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(raw) => {
            let path = PathBuf::from(raw);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExtractError::PdfiumBindingFailed(e.to_string()))?;

    Ok(Pdfium::new(bindings))
}

/// Produce the selected page images of a resolved source.
pub async fn render_source(
    source: &ResolvedSource,
    config: &ExtractionConfig,
) -> Result<RenderedPages, ExtractError> {
    match source.kind {
        SourceKind::Pdf => render_pdf(&source.path, config).await,
        SourceKind::Image(format) => {
            if config.pages.to_indices(1).is_empty() {
                return Err(ExtractError::PageOutOfRange { total: 1 });
            }
            let page = load_image_page(&source.path, format).await?;
            Ok(RenderedPages {
                total_pages: 1,
                pages: vec![page],
            })
        }
    }
}

/// Rasterise the selected pages of a PDF.
pub async fn render_pdf(
    pdf_path: &Path,
    config: &ExtractionConfig,
) -> Result<RenderedPages, ExtractError> {
    let path = pdf_path.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let selection = config.pages.clone();

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let document = open_pdf(&pdfium, &path)?;
        let total = document.pages().len() as usize;
        info!("PDF loaded: {} pages", total);

        let indices = selection.to_indices(total);
        if indices.is_empty() {
            return Err(ExtractError::PageOutOfRange { total });
        }
        let pages = render_pages_blocking(&document, dpi, max_pixels, &indices)?;
        Ok(RenderedPages {
            total_pages: total,
            pages,
        })
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("Render task panicked: {}", e)))?
}

/// Decode an image file as a single RGB page.
pub async fn load_image_page(
    path: &Path,
    format: image::ImageFormat,
) -> Result<PageImage, ExtractError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let decode_err = |source| ExtractError::ImageDecodeFailed {
            path: path.clone(),
            source,
        };
        let bytes = std::fs::read(&path).map_err(|e| decode_err(image::ImageError::IoError(e)))?;
        let image = image::load_from_memory_with_format(&bytes, format)
            .map_err(decode_err)?
            .to_rgb8();
        debug!(
            "Loaded image {} → {}x{} px",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(PageImage { page_num: 1, image })
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("Image decode task panicked: {}", e)))?
}

fn open_pdf<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, ExtractError> {
    pdfium.load_pdf_from_file(path, None).map_err(|e| {
        let detail = format!("{:?}", e);
        if detail.to_lowercase().contains("password") {
            ExtractError::PasswordRequired {
                path: path.to_path_buf(),
            }
        } else {
            ExtractError::CorruptPdf {
                path: path.to_path_buf(),
                detail,
            }
        }
    })
}

/// Scale factor from PDF points to pixels for one page.
///
/// PDF user space is 72 points per inch, so the base factor is `dpi / 72`.
fn render_scale(width_pt: f32, height_pt: f32, dpi: u32, max_pixels: Option<u32>) -> f32 {
    let scale = dpi as f32 / 72.0;
    match max_pixels {
        Some(max) => {
            let longest = width_pt.max(height_pt) * scale;
            if longest > max as f32 {
                max as f32 / width_pt.max(height_pt)
            } else {
                scale
            }
        }
        None => scale,
    }
}

fn render_pages_blocking(
    document: &PdfDocument<'_>,
    dpi: u32,
    max_pixels: Option<u32>,
    page_indices: &[usize],
) -> Result<Vec<PageImage>, ExtractError> {
    let pages = document.pages();
    let mut results = Vec::with_capacity(page_indices.len());

    for &idx in page_indices {
        let raster_err = |e: PdfiumError| ExtractError::RasterisationFailed {
            page: idx + 1,
            detail: format!("{:?}", e),
        };

        let page = pages.get(idx as u16).map_err(raster_err)?;
        let scale = render_scale(page.width().value, page.height().value, dpi, max_pixels);
        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

        let bitmap = page.render_with_config(&render_config).map_err(raster_err)?;

        let image = bitmap.as_image().to_rgb8();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push(PageImage {
            page_num: idx + 1,
            image,
        });
    }

    Ok(results)
}

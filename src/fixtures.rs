//! Sample page images for the live-model test suite.
//!
//! Three synthetic pages, drawn black on white with a system TrueType font:
//!
//! | file                | content                                             |
//! |---------------------|-----------------------------------------------------|
//! | `simple_text.png`   | four sentences of plain text                        |
//! | `table_doc.png`     | "Product Price List" and a 3-column, 4-row table   |
//! | `mixed_content.png` | title, two subheadings, a paragraph, a small table  |
//!
//! The font is looked up in `DOCTAGS_FIXTURE_FONT`, then in the usual
//! DejaVu and Arial locations.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const SIMPLE_TEXT: &str = "simple_text.png";
pub const TABLE_DOC: &str = "table_doc.png";
pub const MIXED_CONTENT: &str = "mixed_content.png";

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "arial.ttf",
];

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("No usable TrueType font found (tried: {tried}).\nSet DOCTAGS_FIXTURE_FONT to a .ttf file.")]
    NoFont { tried: String },

    #[error("Failed to write fixture '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to create fixture directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load the first readable font from the candidate list.
pub fn load_font() -> Result<FontVec, FixtureError> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(p) = std::env::var_os("DOCTAGS_FIXTURE_FONT") {
        candidates.push(PathBuf::from(p));
    }
    candidates.extend(FONT_CANDIDATES.iter().map(PathBuf::from));

    for path in &candidates {
        let Ok(bytes) = std::fs::read(path) else {
            continue;
        };
        if let Ok(font) = FontVec::try_from_vec(bytes) {
            debug!("Fixture font: {}", path.display());
            return Ok(font);
        }
    }

    Err(FixtureError::NoFont {
        tried: candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn blank(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, WHITE)
}

/// Draw `text` line by line, top-left at `(x, y)`.
fn draw_lines(img: &mut RgbImage, font: &FontVec, x: i32, y: i32, size: f32, text: &str) {
    let line_height = (size * 1.2).round() as i32 + 4;
    for (i, line) in text.lines().enumerate() {
        draw_text_mut(
            img,
            BLACK,
            x,
            y + i as i32 * line_height,
            PxScale::from(size),
            font,
            line,
        );
    }
}

/// Bordered grid of `col_width` × `row_height` cells; the header row first.
fn draw_table(
    img: &mut RgbImage,
    font: &FontVec,
    origin: (i32, i32),
    cell: (u32, u32),
    header: &[&str],
    rows: &[&[&str]],
) {
    let (x0, y0) = origin;
    let (col_width, row_height) = cell;

    for (r, row) in std::iter::once(header).chain(rows.iter().copied()).enumerate() {
        for (c, text) in row.iter().enumerate() {
            let x = x0 + c as i32 * col_width as i32;
            let y = y0 + r as i32 * row_height as i32;
            draw_hollow_rect_mut(img, Rect::at(x, y).of_size(col_width + 1, row_height + 1), BLACK);
            draw_text_mut(img, BLACK, x + 10, y + 8, PxScale::from(18.0), font, text);
        }
    }
}

/// 800×400: four sentences of plain text.
pub fn simple_text(font: &FontVec) -> RgbImage {
    let mut img = blank(800, 400);
    draw_lines(
        &mut img,
        font,
        50,
        50,
        20.0,
        "The quick brown fox jumps over the lazy dog.\n\
         This is a simple text document for testing.\n\
         SmolDocling should extract this text accurately.\n\
         Python is a popular programming language.",
    );
    img
}

/// 800×400: a title and a product table.
pub fn table_doc(font: &FontVec) -> RgbImage {
    let mut img = blank(800, 400);
    draw_lines(&mut img, font, 50, 30, 24.0, "Product Price List");
    draw_table(
        &mut img,
        font,
        (50, 80),
        (200, 35),
        &["Product", "Price", "Quantity"],
        &[
            &["Apple", "$1.50", "100"],
            &["Banana", "$0.75", "200"],
            &["Cherry", "$3.00", "50"],
        ],
    );
    img
}

/// 800×600: title, subheadings, paragraph and a two-column table.
pub fn mixed_content(font: &FontVec) -> RgbImage {
    let mut img = blank(800, 600);
    draw_lines(&mut img, font, 50, 30, 28.0, "Annual Report 2025");
    draw_lines(&mut img, font, 50, 80, 22.0, "Executive Summary");
    draw_lines(
        &mut img,
        font,
        50,
        120,
        18.0,
        "Revenue increased by 15% compared to the previous year.\n\
         The company expanded into three new markets.",
    );
    draw_lines(&mut img, font, 50, 220, 22.0, "Financial Overview");
    draw_table(
        &mut img,
        font,
        (50, 270),
        (200, 35),
        &["Metric", "Value"],
        &[&["Revenue", "$10M"], &["Profit", "$2M"]],
    );
    img
}

/// Write all three fixtures into `dir`, creating it if needed.
pub fn generate_all(dir: &Path) -> Result<Vec<PathBuf>, FixtureError> {
    std::fs::create_dir_all(dir).map_err(|source| FixtureError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let font = load_font()?;

    let pages = [
        (SIMPLE_TEXT, simple_text(&font)),
        (TABLE_DOC, table_doc(&font)),
        (MIXED_CONTENT, mixed_content(&font)),
    ];

    let mut written = Vec::with_capacity(pages.len());
    for (name, img) in pages {
        let path = dir.join(name);
        img.save(&path).map_err(|source| FixtureError::Write {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }

    info!("Generated {} fixture images in {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_have_reference_sizes() {
        let Ok(font) = load_font() else {
            eprintln!("Skipping: no TrueType font on this machine");
            return;
        };
        assert_eq!(simple_text(&font).dimensions(), (800, 400));
        assert_eq!(table_doc(&font).dimensions(), (800, 400));
        assert_eq!(mixed_content(&font).dimensions(), (800, 600));
    }

    #[test]
    fn fixtures_contain_ink() {
        let Ok(font) = load_font() else {
            eprintln!("Skipping: no TrueType font on this machine");
            return;
        };
        let img = table_doc(&font);
        // The table border's top-left corner.
        assert_eq!(img.get_pixel(50, 80), &BLACK);
        assert!(img.pixels().filter(|p| **p == BLACK).count() > 1000);
    }

    #[test]
    fn generate_all_writes_three_pngs() {
        if load_font().is_err() {
            eprintln!("Skipping: no TrueType font on this machine");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let written = generate_all(&dir.path().join("images")).unwrap();
        assert_eq!(written.len(), 3);
        for path in written {
            assert!(path.exists());
        }
    }
}

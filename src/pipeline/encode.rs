//! Image encoding: `RgbImage` → base64 PNG wrapped in `ImageData`.
//!
//! The model only ever sees RGB; alpha and grayscale inputs are converted
//! before they reach this stage. PNG keeps glyph edges intact, which matters
//! more than payload size for a 256M-parameter reader.

use crate::error::ExtractError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::RgbImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a page image as a base64 PNG ready for the provider request.
pub fn encode_page(img: &RgbImage, page_num: usize) -> Result<ImageData, ExtractError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| ExtractError::ImageEncodeFailed {
            page: page_num,
            detail: e.to_string(),
        })?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page {} → {} bytes base64", page_num, b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

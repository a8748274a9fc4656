//! Image encoding: `RgbaImage` → base64 PNG wrapped in [`ImagePayload`].
//!
//! Vision APIs accept images as base64 data embedded in the JSON request
//! body. PNG is chosen over JPEG because it is lossless — stroke crispness
//! matters far more than file size for handwriting OCR, and JPEG artefacts
//! around thin pen lines measurably degrade transcription accuracy.

use crate::error::Ocr2MdError;
use crate::provider::ImagePayload;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbaImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a (preprocessed) page image as a base64 PNG payload.
pub fn encode_image(img: &RgbaImage) -> Result<ImagePayload, Ocr2MdError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded {}x{} page → {} bytes base64", img.width(), img.height(), b64.len());

    Ok(ImagePayload::new(b64, "image/png"))
}

//! The vision OCR provider seam.
//!
//! Network transport, SDK glue, and API-key handling all live in the
//! surrounding application — this crate only defines the contract it
//! consumes: hand over encoded page images, get back raw Markdown-ish text,
//! which then goes through
//! [`normalize_latex_delimiters`](crate::normalize_latex_delimiters).
//!
//! The trait is synchronous on purpose. The excluded transport layer owns
//! its own async runtime; from this crate's point of view an OCR call is
//! just "images in, text out", and a caller with an async client can wrap it
//! however it schedules work.

use crate::error::Ocr2MdError;
use serde::{Deserialize, Serialize};

/// A page image encoded for a vision API request body.
///
/// Produced by [`crate::encode_image`]; carried as base64 so it can be
/// embedded directly in a JSON request or rendered as a `data:` URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePayload {
    /// Base64-encoded image bytes.
    pub data: String,
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Render as a `data:` URL, the form most vision APIs accept inline.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Contract for a vision-LLM OCR backend.
///
/// Implementations transcribe the given page images (in order) into a single
/// Markdown-ish text. `extra_instructions` is appended to the system prompt
/// verbatim when present — see [`crate::prompts::with_extra_instructions`].
pub trait OcrProvider: Send + Sync {
    /// Short provider identifier, e.g. `"anthropic"`, used in error messages.
    fn name(&self) -> &str;

    /// Transcribe the images and return the raw model output.
    ///
    /// The returned text is *not* yet normalised; callers are expected to
    /// pass it through [`crate::normalize_latex_delimiters`].
    fn ocr(
        &self,
        images: &[ImagePayload],
        extra_instructions: Option<&str>,
    ) -> Result<String, Ocr2MdError>;
}

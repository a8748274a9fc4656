//! Error types for the ocr2md library.
//!
//! The text engine itself has no failure modes: every string in produces a
//! string out, and unmatched delimiters simply pass through. Errors exist
//! only at the edges — encoding an image payload, validating a
//! configuration, or the provider seam reporting that the surrounding
//! application's transport failed.

use thiserror::Error;

/// All errors returned by the ocr2md library.
#[derive(Debug, Error)]
pub enum Ocr2MdError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Encoding errors ───────────────────────────────────────────────────
    /// PNG encoding of a page image failed.
    #[error("Failed to encode page image as PNG: {0}")]
    ImageEncode(#[from] image::ImageError),

    // ── Provider seam ─────────────────────────────────────────────────────
    /// The configured OCR provider is not initialised (missing API key etc.).
    #[error("OCR provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The provider's transport reported a failure.
    #[error("OCR provider '{provider}' failed: {detail}")]
    ProviderFailed { provider: String, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

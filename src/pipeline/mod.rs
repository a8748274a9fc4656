//! Pipeline stages for scanned-document-to-Markdown conversion.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap
//! implementations (e.g. tune the sharpening filter) without touching other
//! stages.
//!
//! ## Data Flow
//!
//! ```text
//! page image ──▶ preprocess ──▶ encode ──▶ (vision LLM) ──▶ postprocess
//! (RGBA buffer)  (contrast,     (base64     external         (LaTeX delimiter
//!                 sharpen)       PNG)       collaborator      normalisation)
//! ```
//!
//! 1. [`preprocess`] — auto-contrast and unsharp-mask the raw page pixels
//! 2. [`encode`]     — PNG-encode and base64-wrap the image for the
//!    multimodal API request body
//! 3. the vision LLM call itself belongs to the surrounding application; the
//!    seam is [`crate::provider::OcrProvider`]
//! 4. [`postprocess`] — deterministic LaTeX delimiter normalisation of the
//!    raw model output
pub mod encode;
pub mod postprocess;
pub mod preprocess;

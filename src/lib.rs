//! # ocr2md
//!
//! Core transforms for turning scanned and handwritten documents into clean
//! Markdown via vision LLMs.
//!
//! ## Why this crate?
//!
//! Classical OCR engines fall apart on handwriting and mathematical
//! notation. Vision LLMs read both well — but their output needs help on
//! both sides of the call: page images benefit from contrast stretching and
//! sharpening before they are sent, and the returned Markdown needs its
//! LaTeX math delimiters normalised before it renders correctly in
//! KaTeX/MathJax. This crate implements exactly those two transforms; the
//! surrounding application owns file watching, provider transport, and
//! persistence.
//!
//! ## Pipeline Overview
//!
//! ```text
//! page image
//!  │
//!  ├─ 1. Preprocess  auto-contrast + unsharp mask (RGBA, in place)
//!  ├─ 2. Encode      PNG → base64 ImagePayload
//!  ├─ 3. OCR         vision LLM call (external, via OcrProvider)
//!  └─ 4. Normalise   LaTeX delimiter normalisation → final Markdown body
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use ocr2md::normalize_latex_delimiters;
//!
//! // Raw model output: bracket delimiters and stacked display blocks.
//! let raw = "Let \\( x \\) be arbitrary.\n$$P.x$$\n$$Q.x$$";
//! let markdown = normalize_latex_delimiters(raw);
//! assert_eq!(
//!     markdown,
//!     "Let $ x $ be arbitrary.\n$$\n\\begin{gather}\n& P.x \\\\\n& Q.x \\\\\n\\end{gather}\n$$"
//! );
//! ```
//!
//! The text engine is pure and allocation-per-call: safe to invoke
//! concurrently from any number of call sites with no locking. The pixel
//! filters are pure but CPU-bound; use
//! [`preprocess_for_ocr_async`] to keep them off async worker threads.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod provider;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PreprocessConfig, PreprocessConfigBuilder};
pub use error::Ocr2MdError;
pub use pipeline::encode::encode_image;
pub use pipeline::postprocess::{is_prose_line, normalize_latex_delimiters, PROSE_WORD_THRESHOLD};
pub use pipeline::preprocess::{
    auto_contrast, preprocess_for_ocr, preprocess_for_ocr_async, preprocess_for_ocr_with,
    unsharp_mask,
};
pub use provider::{ImagePayload, OcrProvider};

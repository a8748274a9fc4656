//! Configuration for the image preprocessing pipeline.
//!
//! The text engine takes no configuration at all; only the pixel filters
//! have tunable parameters, gathered in [`PreprocessConfig`] so callers can
//! share one value across threads, serialise it for logging, and diff two
//! runs to understand why their outputs differ. Every field has a stated
//! default that matches the standalone filter functions.

use crate::error::Ocr2MdError;
use crate::pipeline::preprocess::{
    DEFAULT_CONTRAST_CUTOFF, DEFAULT_SHARPEN_PERCENT, DEFAULT_SHARPEN_RADIUS,
    DEFAULT_SHARPEN_THRESHOLD,
};
use serde::{Deserialize, Serialize};

/// Parameters for [`crate::preprocess_for_ocr_with`].
///
/// Built via [`PreprocessConfig::builder()`] or using
/// [`PreprocessConfig::default()`].
///
/// # Example
/// ```rust
/// use ocr2md::PreprocessConfig;
///
/// let config = PreprocessConfig::builder()
///     .contrast_cutoff(1.0)
///     .sharpen_percent(200)
///     .build()
///     .unwrap();
/// assert_eq!(config.sharpen_percent, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Percent of pixels ignored at each histogram end by auto-contrast.
    /// Range: 0–49. Default: 0.5.
    ///
    /// A small cutoff stops a handful of outlier pixels (dirt specks, bright
    /// reflections) from compressing the useful tonal range.
    pub contrast_cutoff: f32,

    /// Gaussian sigma for the unsharp-mask blur, in pixels. Default: 1.5.
    ///
    /// Small enough not to thicken pen strokes; raise it for blurry photos
    /// where edges span several pixels.
    pub sharpen_radius: f32,

    /// Edge amplification in percent. Default: 150.
    pub sharpen_percent: u32,

    /// Contrast delta (0–255) below which a pixel is left unsharpened.
    /// Default: 3.
    ///
    /// Keeps smooth paper background untouched so noise is not amplified.
    pub sharpen_threshold: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            contrast_cutoff: DEFAULT_CONTRAST_CUTOFF,
            sharpen_radius: DEFAULT_SHARPEN_RADIUS,
            sharpen_percent: DEFAULT_SHARPEN_PERCENT,
            sharpen_threshold: DEFAULT_SHARPEN_THRESHOLD,
        }
    }
}

impl PreprocessConfig {
    /// Create a new builder for `PreprocessConfig`.
    pub fn builder() -> PreprocessConfigBuilder {
        PreprocessConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PreprocessConfig`].
#[derive(Debug)]
pub struct PreprocessConfigBuilder {
    config: PreprocessConfig,
}

impl PreprocessConfigBuilder {
    pub fn contrast_cutoff(mut self, percent: f32) -> Self {
        self.config.contrast_cutoff = percent;
        self
    }

    pub fn sharpen_radius(mut self, sigma: f32) -> Self {
        self.config.sharpen_radius = sigma;
        self
    }

    pub fn sharpen_percent(mut self, percent: u32) -> Self {
        self.config.sharpen_percent = percent;
        self
    }

    pub fn sharpen_threshold(mut self, delta: u8) -> Self {
        self.config.sharpen_threshold = delta;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PreprocessConfig, Ocr2MdError> {
        let c = &self.config;
        if !(0.0..50.0).contains(&c.contrast_cutoff) {
            return Err(Ocr2MdError::InvalidConfig(format!(
                "contrast cutoff must be 0–49 percent, got {}",
                c.contrast_cutoff
            )));
        }
        if !c.sharpen_radius.is_finite() || c.sharpen_radius <= 0.0 {
            return Err(Ocr2MdError::InvalidConfig(format!(
                "sharpen radius must be a positive number, got {}",
                c.sharpen_radius
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_filter_defaults() {
        let c = PreprocessConfig::default();
        assert_eq!(c.contrast_cutoff, DEFAULT_CONTRAST_CUTOFF);
        assert_eq!(c.sharpen_radius, DEFAULT_SHARPEN_RADIUS);
        assert_eq!(c.sharpen_percent, DEFAULT_SHARPEN_PERCENT);
        assert_eq!(c.sharpen_threshold, DEFAULT_SHARPEN_THRESHOLD);
    }

    #[test]
    fn builder_overrides_fields() {
        let c = PreprocessConfig::builder()
            .contrast_cutoff(2.0)
            .sharpen_radius(3.0)
            .sharpen_percent(80)
            .sharpen_threshold(10)
            .build()
            .unwrap();
        assert_eq!(c.contrast_cutoff, 2.0);
        assert_eq!(c.sharpen_radius, 3.0);
        assert_eq!(c.sharpen_percent, 80);
        assert_eq!(c.sharpen_threshold, 10);
    }

    #[test]
    fn negative_cutoff_rejected() {
        let err = PreprocessConfig::builder()
            .contrast_cutoff(-1.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("cutoff"));
    }

    #[test]
    fn excessive_cutoff_rejected() {
        assert!(PreprocessConfig::builder().contrast_cutoff(50.0).build().is_err());
    }

    #[test]
    fn zero_radius_rejected() {
        let err = PreprocessConfig::builder()
            .sharpen_radius(0.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("radius"));
    }
}

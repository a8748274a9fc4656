//! Image preprocessing: auto-contrast and unsharp masking before OCR.
//!
//! ## Why preprocess at all?
//!
//! Handwritten pages photographed or scanned in the wild arrive with faint
//! pencil strokes, yellowed paper, and uneven lighting. Two cheap filters fix
//! most of it:
//!
//! 1. **Auto-contrast** — stretches each RGB channel's histogram so the
//!    darkest pixels map towards black and the lightest towards white, with a
//!    small cutoff so a few outlier pixels (dirt, specular reflections) don't
//!    compress the useful tonal range.
//! 2. **Unsharp mask** — sharpens symbol edges without amplifying smooth
//!    background noise, making fine strokes in mathematical notation easier
//!    for the model to distinguish.
//!
//! Colour is preserved throughout: annotated notes carry meaning in ink
//! colour, so there is no grayscale conversion and no binarisation. The alpha
//! channel is never touched by either filter.
//!
//! Both filters mutate the buffer in place, never panic on degenerate inputs
//! (1×1, fully uniform, zero-sized), and always produce bytes in [0, 255].
//! They are synchronous and CPU-bound; [`preprocess_for_ocr_async`] offloads
//! them via `spawn_blocking` for callers living on an async runtime.

use crate::config::PreprocessConfig;
use crate::error::Ocr2MdError;
use image::RgbaImage;
use tracing::debug;

/// Default histogram cutoff for [`auto_contrast`], in percent per end.
pub const DEFAULT_CONTRAST_CUTOFF: f32 = 0.5;

/// Default Gaussian radius (sigma) for [`unsharp_mask`]. Small enough not to
/// thicken pen strokes.
pub const DEFAULT_SHARPEN_RADIUS: f32 = 1.5;

/// Default edge amplification for [`unsharp_mask`], in percent.
pub const DEFAULT_SHARPEN_PERCENT: u32 = 150;

/// Default contrast delta below which [`unsharp_mask`] leaves a pixel alone,
/// so smooth paper background stays untouched.
pub const DEFAULT_SHARPEN_THRESHOLD: u8 = 3;

/// Run the standard preprocessing pipeline in place with default parameters.
pub fn preprocess_for_ocr(img: &mut RgbaImage) {
    auto_contrast(img, DEFAULT_CONTRAST_CUTOFF);
    unsharp_mask(
        img,
        DEFAULT_SHARPEN_RADIUS,
        DEFAULT_SHARPEN_PERCENT,
        DEFAULT_SHARPEN_THRESHOLD,
    );
}

/// Run the preprocessing pipeline in place with explicit parameters.
pub fn preprocess_for_ocr_with(img: &mut RgbaImage, config: &PreprocessConfig) {
    auto_contrast(img, config.contrast_cutoff);
    unsharp_mask(
        img,
        config.sharpen_radius,
        config.sharpen_percent,
        config.sharpen_threshold,
    );
}

/// Run [`preprocess_for_ocr`] on a blocking thread.
///
/// The filters are CPU-bound; a UI or server host should not run them on its
/// async workers. Takes the image by value and hands it back, mirroring how
/// the buffer moves across the thread boundary.
pub async fn preprocess_for_ocr_async(mut img: RgbaImage) -> Result<RgbaImage, Ocr2MdError> {
    tokio::task::spawn_blocking(move || {
        preprocess_for_ocr(&mut img);
        img
    })
    .await
    .map_err(|e| Ocr2MdError::Internal(format!("Preprocess task panicked: {}", e)))
}

// ── Auto-contrast ────────────────────────────────────────────────────────────

/// Stretch each RGB channel's tonal range in place.
///
/// Per channel: build a 256-bin histogram, find `lo` / `hi` by accumulating
/// `cutoff_percent` of the pixel count from the dark and bright ends, then
/// linearly rescale so `lo → 0` and `hi → 255`. A channel whose bounds
/// collapse (`lo >= hi`, e.g. a constant channel) is skipped entirely, which
/// keeps pure colours pure. Alpha is never modified.
pub fn auto_contrast(img: &mut RgbaImage, cutoff_percent: f32) {
    let total = u64::from(img.width()) * u64::from(img.height());
    if total == 0 {
        return;
    }
    let cutoff = f64::from(cutoff_percent.clamp(0.0, 49.0));
    let cut = (total as f64 * cutoff / 100.0).floor() as u64;

    let mut hist = [[0u64; 256]; 3];
    for p in img.pixels() {
        for (c, bins) in hist.iter_mut().enumerate() {
            bins[p.0[c] as usize] += 1;
        }
    }

    let mut luts: [Option<[u8; 256]>; 3] = [None, None, None];
    for (c, bins) in hist.iter().enumerate() {
        if let Some((lo, hi)) = channel_bounds(bins, cut) {
            debug!("auto-contrast: channel {} stretched, lo={} hi={}", c, lo, hi);
            luts[c] = Some(rescale_lut(lo, hi));
        } else {
            debug!("auto-contrast: channel {} flat, skipped", c);
        }
    }
    if luts.iter().all(Option::is_none) {
        return;
    }

    for p in img.pixels_mut() {
        for (c, lut) in luts.iter().enumerate() {
            if let Some(lut) = lut {
                p.0[c] = lut[p.0[c] as usize];
            }
        }
    }
}

/// Darkest/brightest values that survive the cutoff, or `None` when the
/// channel has no range left to stretch.
fn channel_bounds(hist: &[u64; 256], cut: u64) -> Option<(u8, u8)> {
    let mut cum = 0u64;
    let lo = hist.iter().position(|&n| {
        cum += n;
        cum > cut
    })?;

    let mut cum = 0u64;
    let hi = hist.iter().rposition(|&n| {
        cum += n;
        cum > cut
    })?;

    if lo < hi {
        Some((lo as u8, hi as u8))
    } else {
        None
    }
}

fn rescale_lut(lo: u8, hi: u8) -> [u8; 256] {
    let scale = 255.0 / (f64::from(hi) - f64::from(lo));
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate() {
        *slot = ((v as f64 - f64::from(lo)) * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

// ── Unsharp mask ─────────────────────────────────────────────────────────────

/// Sharpen symbol edges in place.
///
/// Computes a separable Gaussian blur (sigma = `radius`, edge-replicated
/// sampling) of each RGB channel, then for every pixel where the original
/// differs from the blur by more than `threshold`, amplifies that difference
/// by `percent` and clamps to [0, 255]. Pixels at or below the threshold are
/// left untouched, so uniform areas never change. Alpha is copied through
/// unmodified.
pub fn unsharp_mask(img: &mut RgbaImage, radius: f32, percent: u32, threshold: u8) {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w == 0 || h == 0 || radius <= 0.0 {
        return;
    }
    let kernel = gaussian_kernel(radius);
    let amount = percent as f32 / 100.0;
    let threshold = f32::from(threshold);

    for c in 0..3 {
        let channel: Vec<f32> = img.pixels().map(|p| f32::from(p.0[c])).collect();
        let blurred = blur_separable(&channel, w, h, &kernel);
        for (i, p) in img.pixels_mut().enumerate() {
            let orig = f32::from(p.0[c]);
            let diff = orig - blurred[i];
            if diff.abs() > threshold {
                p.0[c] = (orig + diff * amount).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    debug!("unsharp mask applied: radius={} percent={}", radius, percent);
}

/// Normalised 1-D Gaussian kernel covering ±3 sigma.
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let r = (sigma * 3.0).ceil().max(1.0) as isize;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-r..=r).map(|i| (-(i * i) as f32 / denom).exp()).collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Two-pass separable convolution with clamped (edge-replicated) sampling.
fn blur_separable(src: &[f32], w: usize, h: usize, kernel: &[f32]) -> Vec<f32> {
    let r = (kernel.len() / 2) as isize;

    let mut tmp = vec![0.0f32; src.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, &weight) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - r).clamp(0, w as isize - 1) as usize;
                acc += src[y * w + sx] * weight;
            }
            tmp[y * w + x] = acc;
        }
    }

    let mut out = vec![0.0f32; src.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, &weight) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - r).clamp(0, h as isize - 1) as usize;
                acc += tmp[sy * w + x] * weight;
            }
            out[y * w + x] = acc;
        }
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────────────────

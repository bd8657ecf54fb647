// ============================================================================
// IMAGE FILTERS — named, parameterized whole-surface transforms
// ============================================================================

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use rayon::prelude::*;

use crate::error::{CanvasError, CanvasResult};
use crate::ops::adjustments;

/// Blur radius used when `blur` is given without an argument.
pub const DEFAULT_BLUR_PX: f32 = 4.0;

/// Largest blur radius accepted; bigger values are clamped to it.
pub const MAX_BLUR_PX: f32 = 1000.0;

/// The closed set of filters the UI can request.
///
/// Parsed from CSS filter syntax: `none`, `grayscale(100%)`, `sepia(100%)`,
/// `invert(100%)`, `blur(4px)`, `brightness(150%)`, `contrast(200%)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterSpec {
    Identity,
    Grayscale(f32),
    Sepia(f32),
    Invert(f32),
    /// Gaussian standard deviation in pixels.
    Blur(f32),
    Brightness(f32),
    Contrast(f32),
}

impl FilterSpec {
    pub fn parse(text: &str) -> CanvasResult<Self> {
        let raw = text.trim().to_ascii_lowercase();
        let unknown = || CanvasError::unknown_filter(text.trim());

        let (name, arg) = match raw.split_once('(') {
            Some((name, rest)) => {
                let arg = rest.strip_suffix(')').ok_or_else(unknown)?;
                (name.trim(), Some(arg.trim()))
            }
            None => (raw.as_str(), None),
        };

        let spec = match name {
            "none" | "identity" if arg.is_none() => FilterSpec::Identity,
            "grayscale" | "greyscale" => FilterSpec::Grayscale(amount(arg, 1.0).ok_or_else(unknown)?.min(1.0)),
            "sepia" => FilterSpec::Sepia(amount(arg, 1.0).ok_or_else(unknown)?.min(1.0)),
            "invert" => FilterSpec::Invert(amount(arg, 1.0).ok_or_else(unknown)?.min(1.0)),
            "brightness" => FilterSpec::Brightness(amount(arg, 1.0).ok_or_else(unknown)?),
            "contrast" => FilterSpec::Contrast(amount(arg, 1.0).ok_or_else(unknown)?),
            "blur" => FilterSpec::Blur(length(arg, DEFAULT_BLUR_PX).ok_or_else(unknown)?.min(MAX_BLUR_PX)),
            _ => return Err(unknown()),
        };
        Ok(spec)
    }

    /// Render `src` through this filter.
    pub fn apply(&self, src: &RgbaImage) -> RgbaImage {
        match *self {
            FilterSpec::Identity => src.clone(),
            FilterSpec::Grayscale(a) => adjustments::grayscale(src, a),
            FilterSpec::Sepia(a) => adjustments::sepia(src, a),
            FilterSpec::Invert(a) => adjustments::invert(src, a),
            FilterSpec::Brightness(f) => adjustments::brightness(src, f),
            FilterSpec::Contrast(f) => adjustments::contrast(src, f),
            FilterSpec::Blur(sigma) => parallel_gaussian_blur(src, sigma),
        }
    }
}

impl FromStr for FilterSpec {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterSpec::parse(s)
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSpec::Identity => write!(f, "none"),
            FilterSpec::Grayscale(a) => write!(f, "grayscale({}%)", a * 100.0),
            FilterSpec::Sepia(a) => write!(f, "sepia({}%)", a * 100.0),
            FilterSpec::Invert(a) => write!(f, "invert({}%)", a * 100.0),
            FilterSpec::Blur(px) => write!(f, "blur({}px)", px),
            FilterSpec::Brightness(p) => write!(f, "brightness({}%)", p * 100.0),
            FilterSpec::Contrast(p) => write!(f, "contrast({}%)", p * 100.0),
        }
    }
}

/// `50%` or `0.5`; missing argument yields `default`. Negative is invalid.
fn amount(arg: Option<&str>, default: f32) -> Option<f32> {
    let Some(arg) = arg else { return Some(default) };
    let value = match arg.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().ok()? / 100.0,
        None => arg.parse::<f32>().ok()?,
    };
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// `4px` or `4`; missing argument yields `default`. Negative is invalid.
fn length(arg: Option<&str>, default: f32) -> Option<f32> {
    let Some(arg) = arg else { return Some(default) };
    let value = arg.strip_suffix("px").unwrap_or(arg).trim().parse::<f32>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

// ---------------------------------------------------------------------------
//  Parallel separable Gaussian blur (rayon)
// ---------------------------------------------------------------------------

/// Build a 1-D Gaussian kernel truncated at ceil(3*sigma), and never wider
/// than `max_radius` on either side.
fn build_gaussian_kernel(sigma: f32, max_radius: usize) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil().min(max_radius as f32) as usize;
    if radius == 0 {
        return vec![1.0];
    }
    let Some(len) = radius.checked_mul(2).and_then(|d| d.checked_add(1)) else {
        return vec![1.0];
    };
    let s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..len)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / s2).exp()
        })
        .collect();
    let inv = 1.0 / kernel.iter().sum::<f32>();
    for v in &mut kernel {
        *v *= inv;
    }
    kernel
}

/// Separable Gaussian blur; edges are clamped.
fn parallel_gaussian_blur(src: &RgbaImage, sigma: f32) -> RgbaImage {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }
    // Taps past the far edge only re-read clamped pixels.
    let kernel = build_gaussian_kernel(sigma, w.max(h));
    if kernel.len() == 1 {
        return src.clone();
    }
    let radius = kernel.len() / 2;
    let stride = w * 4;
    let buf_in: Vec<f32> = src.as_raw().iter().map(|&b| b as f32).collect();

    // --- Horizontal pass (parallel by row) ---
    let mut buf_h = vec![0.0f32; w * h * 4];
    buf_h.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_in = &buf_in[y * stride..(y + 1) * stride];
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for (ki, &kv) in kernel.iter().enumerate() {
                let sx = (x + ki).saturating_sub(radius).min(w - 1);
                for c in 0..4 {
                    acc[c] += row_in[sx * 4 + c] * kv;
                }
            }
            row_out[x * 4..x * 4 + 4].copy_from_slice(&acc);
        }
    });

    // --- Vertical pass (parallel by row) ---
    let mut out = RgbaImage::new(w as u32, h as u32);
    let dst_raw: &mut [u8] = &mut out;
    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = (y + ki).saturating_sub(radius).min(h - 1);
                let idx = sy * stride + x * 4;
                for c in 0..4 {
                    acc[c] += buf_h[idx + c] * kv;
                }
            }
            for c in 0..4 {
                row_out[x * 4 + c] = acc[c].round().clamp(0.0, 255.0) as u8;
            }
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn parses_css_names() {
        assert_eq!(FilterSpec::parse("none").unwrap(), FilterSpec::Identity);
        assert_eq!(FilterSpec::parse("identity").unwrap(), FilterSpec::Identity);
        assert_eq!(FilterSpec::parse("grayscale(100%)").unwrap(), FilterSpec::Grayscale(1.0));
        assert_eq!(FilterSpec::parse(" Sepia( 50% ) ").unwrap(), FilterSpec::Sepia(0.5));
        assert_eq!(FilterSpec::parse("invert").unwrap(), FilterSpec::Invert(1.0));
        assert_eq!(FilterSpec::parse("blur(4px)").unwrap(), FilterSpec::Blur(4.0));
        assert_eq!(FilterSpec::parse("blur").unwrap(), FilterSpec::Blur(DEFAULT_BLUR_PX));
        assert_eq!(FilterSpec::parse("brightness(150%)").unwrap(), FilterSpec::Brightness(1.5));
        assert_eq!(FilterSpec::parse("contrast(2)").unwrap(), FilterSpec::Contrast(2.0));
        assert_eq!(FilterSpec::parse("grayscale(250%)").unwrap(), FilterSpec::Grayscale(1.0));
    }

    #[test]
    fn rejects_unknown_and_malformed() {
        for bad in ["", "glow(2)", "blur(-1px)", "sepia(abc)", "grayscale(100%", "none(1)", "hue-rotate(90deg)"] {
            let err = FilterSpec::parse(bad).unwrap_err();
            assert!(matches!(err, CanvasError::UnknownFilter(_)), "{bad}");
        }
    }

    #[test]
    fn display_round_trips_through_parse() {
        for text in ["none", "grayscale(100%)", "sepia(50%)", "blur(4px)", "brightness(150%)"] {
            let spec = FilterSpec::parse(text).unwrap();
            assert_eq!(FilterSpec::parse(&spec.to_string()).unwrap(), spec);
        }
    }

    #[test]
    fn kernel_is_normalized() {
        let k = build_gaussian_kernel(2.0, 100);
        assert_eq!(k.len(), 13);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert_eq!(build_gaussian_kernel(0.0, 100), vec![1.0]);
    }

    #[test]
    fn huge_radii_are_bounded() {
        assert_eq!(FilterSpec::parse("blur(1e30px)").unwrap(), FilterSpec::Blur(MAX_BLUR_PX));
        assert_eq!(FilterSpec::parse("blur(10000px)").unwrap(), FilterSpec::Blur(MAX_BLUR_PX));
        assert_eq!(build_gaussian_kernel(1e30, 8).len(), 17);
        assert_eq!(build_gaussian_kernel(f32::MAX, 3).len(), 7);

        let img = RgbaImage::from_pixel(5, 3, Rgba([10, 20, 30, 255]));
        let out = FilterSpec::Blur(1e30).apply(&img);
        assert_eq!(out.dimensions(), (5, 3));
    }

    #[test]
    fn blur_keeps_solid_colour_and_softens_edges() {
        let solid = RgbaImage::from_pixel(16, 16, Rgba([40, 80, 120, 255]));
        assert_eq!(FilterSpec::Blur(3.0).apply(&solid), solid);

        let mut edge = RgbaImage::from_pixel(16, 1, Rgba([0, 0, 0, 255]));
        for x in 8..16 {
            edge.put_pixel(x, 0, Rgba([255, 255, 255, 255]));
        }
        let out = FilterSpec::Blur(2.0).apply(&edge);
        let left = out.get_pixel(7, 0)[0];
        let right = out.get_pixel(8, 0)[0];
        assert!(left > 0 && left < 128, "{left}");
        assert!(right > 128 && right < 255, "{right}");
        assert_eq!(out.get_pixel(0, 0)[3], 255);
    }
}

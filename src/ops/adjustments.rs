// ============================================================================
// ADJUSTMENT OPERATIONS — per-pixel colour transforms
// ============================================================================
//
// Every transform reads a flattened RGBA image and returns a new one of the
// same size. Alpha is always preserved. Rows are processed in parallel.
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

/// Rec.709 luma weights, as used by the CSS filter matrices.
const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

// ============================================================================
// HELPER: parallel per-pixel transform
// ============================================================================

/// Apply `transform` to every pixel. It receives (r, g, b, a) as f32 in
/// 0..=255 and returns (r, g, b, a); results are rounded and clamped.
pub(crate) fn map_pixels<F>(src: &RgbaImage, transform: F) -> RgbaImage
where
    F: Fn(f32, f32, f32, f32) -> (f32, f32, f32, f32) + Sync,
{
    let (w, h) = src.dimensions();
    let mut out = RgbaImage::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }
    let stride = w as usize * 4;
    let src_raw = src.as_raw();

    let dst_raw: &mut [u8] = &mut out;
    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_in = &src_raw[y * stride..(y + 1) * stride];
        for (px_in, px_out) in row_in.chunks_exact(4).zip(row_out.chunks_exact_mut(4)) {
            let (nr, ng, nb, na) = transform(
                px_in[0] as f32,
                px_in[1] as f32,
                px_in[2] as f32,
                px_in[3] as f32,
            );
            px_out[0] = nr.round().clamp(0.0, 255.0) as u8;
            px_out[1] = ng.round().clamp(0.0, 255.0) as u8;
            px_out[2] = nb.round().clamp(0.0, 255.0) as u8;
            px_out[3] = na.round().clamp(0.0, 255.0) as u8;
        }
    });
    out
}

/// 3×3 colour matrix applied to RGB.
fn color_matrix(src: &RgbaImage, m: [[f32; 3]; 3]) -> RgbaImage {
    map_pixels(src, move |r, g, b, a| {
        (
            m[0][0] * r + m[0][1] * g + m[0][2] * b,
            m[1][0] * r + m[1][1] * g + m[1][2] * b,
            m[2][0] * r + m[2][1] * g + m[2][2] * b,
            a,
        )
    })
}

// ============================================================================
// COLOUR TRANSFORMS
// ============================================================================

/// Desaturate toward Rec.709 luminance. `amount` 0..=1; at 1 every pixel
/// becomes R = G = B.
pub fn grayscale(src: &RgbaImage, amount: f32) -> RgbaImage {
    let s = 1.0 - amount.clamp(0.0, 1.0);
    let [lr, lg, lb] = LUMA;
    color_matrix(
        src,
        [
            [lr + (1.0 - lr) * s, lg - lg * s, lb - lb * s],
            [lr - lr * s, lg + (1.0 - lg) * s, lb - lb * s],
            [lr - lr * s, lg - lg * s, lb + (1.0 - lb) * s],
        ],
    )
}

/// Apply a sepia tone effect, blended by `amount` 0..=1.
pub fn sepia(src: &RgbaImage, amount: f32) -> RgbaImage {
    let s = 1.0 - amount.clamp(0.0, 1.0);
    color_matrix(
        src,
        [
            [0.393 + 0.607 * s, 0.769 - 0.769 * s, 0.189 - 0.189 * s],
            [0.349 - 0.349 * s, 0.686 + 0.314 * s, 0.168 - 0.168 * s],
            [0.272 - 0.272 * s, 0.534 - 0.534 * s, 0.131 + 0.869 * s],
        ],
    )
}

/// Invert R, G, B, blended by `amount` 0..=1. Alpha is preserved.
pub fn invert(src: &RgbaImage, amount: f32) -> RgbaImage {
    let a = amount.clamp(0.0, 1.0);
    map_pixels(src, move |r, g, b, alpha| {
        (
            r * (1.0 - a) + (255.0 - r) * a,
            g * (1.0 - a) + (255.0 - g) * a,
            b * (1.0 - a) + (255.0 - b) * a,
            alpha,
        )
    })
}

/// Linear brightness multiplier (1.0 = unchanged, 0.0 = black).
pub fn brightness(src: &RgbaImage, factor: f32) -> RgbaImage {
    map_pixels(src, move |r, g, b, a| (r * factor, g * factor, b * factor, a))
}

/// Contrast around mid-grey (1.0 = unchanged, 0.0 = flat grey).
pub fn contrast(src: &RgbaImage, factor: f32) -> RgbaImage {
    const MID: f32 = 127.5;
    map_pixels(src, move |r, g, b, a| {
        (
            (r - MID) * factor + MID,
            (g - MID) * factor + MID,
            (b - MID) * factor + MID,
            a,
        )
    })
}

// ============================================================================
// PIXEL SURFACE — the single opaque raster buffer behind the canvas
// ============================================================================

use std::fmt;

use image::{Rgba, RgbaImage};

use crate::error::{CanvasError, CanvasResult};

/// Background fill. The canvas is fully opaque; the eraser paints this colour.
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

// ============================================================================
// SNAPSHOT
// ============================================================================

/// An independent full copy of the surface's pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct Snapshot {
    image: RgbaImage,
}

impl Snapshot {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.image.get_pixel_checked(x, y).copied()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// 4 bytes per RGBA pixel.
    pub fn memory_bytes(&self) -> usize {
        self.image.as_raw().len()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

// ============================================================================
// PIXEL SURFACE
// ============================================================================

/// Owns the canvas's ground-truth pixels.
///
/// Outside this crate the buffer is read-only: mutation goes through the
/// stroke engine, the compositing ops, the history manager, or [`resize`].
///
/// [`resize`]: PixelSurface::resize
pub struct PixelSurface {
    pixels: RgbaImage,
}

impl PixelSurface {
    /// Allocate a `width`×`height` surface filled with opaque white.
    pub fn new(width: u32, height: u32) -> CanvasResult<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            pixels: RgbaImage::from_pixel(width, height, BACKGROUND),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.pixels.get_pixel_checked(x, y).copied()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Copy the current contents into a new snapshot.
    pub fn read_pixels(&self) -> Snapshot {
        Snapshot {
            image: self.pixels.clone(),
        }
    }

    /// Overwrite the live buffer in place with `snapshot`.
    pub(crate) fn write_pixels(&mut self, snapshot: &Snapshot) -> CanvasResult<()> {
        if snapshot.width() != self.width() || snapshot.height() != self.height() {
            return Err(CanvasError::DimensionMismatch {
                snapshot_width: snapshot.width(),
                snapshot_height: snapshot.height(),
                surface_width: self.width(),
                surface_height: self.height(),
            });
        }
        self.pixels.copy_from_slice(snapshot.image.as_raw());
        Ok(())
    }

    /// Reallocate at the new size and re-stamp the old pixels at the top-left
    /// origin, clipped to the overlap. No scaling; the rest is background.
    pub fn resize(&mut self, new_width: u32, new_height: u32) -> CanvasResult<()> {
        check_dimensions(new_width, new_height)?;
        if new_width == self.width() && new_height == self.height() {
            return Ok(());
        }

        let mut resized = RgbaImage::from_pixel(new_width, new_height, BACKGROUND);
        let copy_w = self.width().min(new_width) as usize;
        let copy_h = self.height().min(new_height) as usize;
        let src_stride = self.width() as usize * 4;
        let dst_stride = new_width as usize * 4;
        let src = self.pixels.as_raw();
        {
            let dst: &mut [u8] = &mut resized;
            for y in 0..copy_h {
                let src_row = &src[y * src_stride..y * src_stride + copy_w * 4];
                dst[y * dst_stride..y * dst_stride + copy_w * 4].copy_from_slice(src_row);
            }
        }

        tracing::debug!(
            from_w = self.width(),
            from_h = self.height(),
            to_w = new_width,
            to_h = new_height,
            "surface resized"
        );
        self.pixels = resized;
        Ok(())
    }

    /// Encode the current contents as PNG.
    pub fn export_encoded(&self) -> CanvasResult<Vec<u8>> {
        crate::io::encode_png(&self.pixels)
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// Swap in a whole new buffer of the same size (filter output).
    pub(crate) fn replace_pixels(&mut self, image: RgbaImage) {
        debug_assert_eq!(image.dimensions(), self.pixels.dimensions());
        self.pixels = image;
    }
}

fn check_dimensions(width: u32, height: u32) -> CanvasResult<()> {
    if width == 0 || height == 0 {
        return Err(CanvasError::InvalidDimensions { width, height });
    }
    Ok(())
}

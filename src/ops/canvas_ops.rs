// ============================================================================
// COMPOSITING OPERATIONS — filters, image insertion, export hand-off
// ============================================================================
//
// Each mutating operation validates its input first, then takes exactly one
// history checkpoint, then writes the surface. A failure before the
// checkpoint leaves surface and history untouched.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::canvas::{BACKGROUND, PixelSurface};
use crate::components::history::HistoryManager;
use crate::error::CanvasResult;
use crate::io;
use crate::ops::filters::FilterSpec;

/// Layout policy for compositing an external image onto the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Fit inside half the surface in each axis, centred. Used for AI-added images.
    CenteredScaled,
    /// Fit inside the whole surface over a white background, centred. Used for
    /// imports and smart-edit results.
    FitCanvas,
}

/// Where an inserted image landed, in surface pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacedRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Run the whole surface through `spec`.
pub fn apply_filter(surface: &mut PixelSurface, history: &mut HistoryManager, spec: FilterSpec) {
    history.checkpoint(surface, format!("Filter: {spec}"));
    let filtered = spec.apply(surface.as_image());
    surface.replace_pixels(filtered);
    tracing::info!(filter = %spec, "filter applied");
}

/// Parse `name` and apply it. Unknown names fail before any checkpoint.
pub fn apply_named_filter(surface: &mut PixelSurface, history: &mut HistoryManager, name: &str) -> CanvasResult<FilterSpec> {
    let spec = FilterSpec::parse(name)?;
    apply_filter(surface, history, spec);
    Ok(spec)
}

/// Decode `image_bytes` and composite it according to `placement`.
pub fn insert_image(
    surface: &mut PixelSurface,
    history: &mut HistoryManager,
    image_bytes: &[u8],
    placement: Placement,
) -> CanvasResult<PlacedRect> {
    let decoded = io::decode_image(image_bytes)?;
    Ok(insert_decoded(surface, history, &decoded, placement))
}

/// Composite an already-decoded image. Geometry comes from the surface as it
/// is right now.
pub fn insert_decoded(
    surface: &mut PixelSurface,
    history: &mut HistoryManager,
    image: &RgbaImage,
    placement: Placement,
) -> PlacedRect {
    let label = match placement {
        Placement::CenteredScaled => "Add Image",
        Placement::FitCanvas => "Import Image",
    };
    history.checkpoint(surface, label);

    let rect = placement_rect(surface.width(), surface.height(), image.width(), image.height(), placement);
    let scaled = if (rect.width, rect.height) == image.dimensions() {
        image.clone()
    } else {
        imageops::resize(image, rect.width, rect.height, FilterType::Triangle)
    };

    let pixels = surface.pixels_mut();
    if placement == Placement::FitCanvas {
        for p in pixels.pixels_mut() {
            *p = BACKGROUND;
        }
    }
    imageops::overlay(pixels, &scaled, rect.x, rect.y);

    tracing::info!(
        placement = ?placement,
        x = rect.x,
        y = rect.y,
        width = rect.width,
        height = rect.height,
        "image inserted"
    );
    rect
}

/// PNG of the current surface for the smart-edit collaborator.
pub fn export_for_editing(surface: &PixelSurface) -> CanvasResult<Vec<u8>> {
    surface.export_encoded()
}

/// Uniform aspect-preserving scale so the image fits the target box, centred.
///
/// The drawn size is never below 1x1. On a surface only 1 px wide or tall
/// the half-size box rounds down to nothing, so `CenteredScaled` then draws
/// 1 px in that axis, which is the whole surface rather than half of it.
pub fn placement_rect(canvas_w: u32, canvas_h: u32, image_w: u32, image_h: u32, placement: Placement) -> PlacedRect {
    let share = match placement {
        Placement::CenteredScaled => 0.5,
        Placement::FitCanvas => 1.0,
    };
    let box_w = canvas_w as f64 * share;
    let box_h = canvas_h as f64 * share;
    let scale = (box_w / image_w.max(1) as f64).min(box_h / image_h.max(1) as f64);

    // Round, but never past the box and never down to nothing.
    let width = (image_w as f64 * scale).round().min(box_w.floor()).max(1.0) as u32;
    let height = (image_h as f64 * scale).round().min(box_h.floor()).max(1.0) as u32;
    PlacedRect {
        x: (canvas_w as i64 - width as i64) / 2,
        y: (canvas_h as i64 - height as i64) / 2,
        width,
        height,
    }
}

use image::{Rgba, RgbaImage};

use crate::canvas::{BACKGROUND, PixelSurface};
use crate::components::history::HistoryManager;

// ============================================================================
// TOOLS
// ============================================================================

/// Closed set of tools the UI can select.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    Select,
    #[default]
    Brush,
    Eraser,
    Hand,
    AiAdd,
    SmartEdit,
    /// Video workflow tools; they never touch the canvas.
    VideoPrompt,
    VideoReference,
}

impl Tool {
    pub fn all() -> &'static [Tool] {
        &[
            Tool::Select,
            Tool::Brush,
            Tool::Eraser,
            Tool::Hand,
            Tool::AiAdd,
            Tool::SmartEdit,
            Tool::VideoPrompt,
            Tool::VideoReference,
        ]
    }

    /// Parse the identifier the UI sends.
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "select" => Some(Tool::Select),
            "brush" => Some(Tool::Brush),
            "eraser" => Some(Tool::Eraser),
            "hand" | "pan" => Some(Tool::Hand),
            "ai-add" => Some(Tool::AiAdd),
            "smart-edit" => Some(Tool::SmartEdit),
            "video-prompt" => Some(Tool::VideoPrompt),
            "video-reference" => Some(Tool::VideoReference),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Tool::Select => "select",
            Tool::Brush => "brush",
            Tool::Eraser => "eraser",
            Tool::Hand => "hand",
            Tool::AiAdd => "ai-add",
            Tool::SmartEdit => "smart-edit",
            Tool::VideoPrompt => "video-prompt",
            Tool::VideoReference => "video-reference",
        }
    }
}

/// Cursor the view should show over the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorHint {
    Default,
    Crosshair,
    Grab,
    Cell,
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolAffordance {
    /// Whether pointer drags paint on the surface.
    pub draws: bool,
    pub cursor: CursorHint,
}

/// Maps the selected tool to what the pointer does.
pub struct ToolController;

impl ToolController {
    pub fn affordance(tool: Tool) -> ToolAffordance {
        let (draws, cursor) = match tool {
            Tool::Brush | Tool::Eraser => (true, CursorHint::Crosshair),
            Tool::Hand => (false, CursorHint::Grab),
            Tool::AiAdd => (false, CursorHint::Cell),
            Tool::SmartEdit | Tool::VideoPrompt => (false, CursorHint::Text),
            Tool::Select | Tool::VideoReference => (false, CursorHint::Default),
        };
        ToolAffordance { draws, cursor }
    }

    pub fn draws(tool: Tool) -> bool {
        Self::affordance(tool).draws
    }
}

// ============================================================================
// BRUSH SETTINGS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrushSettings {
    /// Stroke width in pixels.
    pub size: u32,
    /// Opaque RGB colour.
    pub color: [u8; 3],
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 10,
            color: [0x06, 0xb6, 0xd4],
        }
    }
}

impl BrushSettings {
    pub fn new(size: u32, color: [u8; 3]) -> Self {
        Self {
            size: size.max(1),
            color,
        }
    }

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn parse_color(hex: &str) -> Option<[u8; 3]> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some([channel(0)?, channel(2)?, channel(4)?])
    }

    pub fn color_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.color[0], self.color[1], self.color[2])
    }

    fn paint_color(&self, tool: Tool) -> Rgba<u8> {
        match tool {
            // Opaque-canvas model: erasing paints the background colour.
            Tool::Eraser => BACKGROUND,
            _ => Rgba([self.color[0], self.color[1], self.color[2], 255]),
        }
    }
}

// ============================================================================
// STROKE ENGINE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StrokeState {
    Idle,
    Stroking {
        tool: Tool,
        last: (f32, f32),
        segments: usize,
    },
}

/// Turns pointer drags into brush or eraser strokes. One drag is one undo step.
pub struct StrokeEngine {
    state: StrokeState,
}

impl Default for StrokeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StrokeEngine {
    pub fn new() -> Self {
        Self {
            state: StrokeState::Idle,
        }
    }

    pub fn state(&self) -> StrokeState {
        self.state
    }

    pub fn is_stroking(&self) -> bool {
        matches!(self.state, StrokeState::Stroking { .. })
    }

    /// Pointer pressed. Starts a stroke when `tool` draws; the checkpoint is
    /// taken here, before any pixel changes. Returns whether a stroke began.
    pub fn begin(
        &mut self,
        surface: &PixelSurface,
        history: &mut HistoryManager,
        tool: Tool,
        pos: (f32, f32),
    ) -> bool {
        if !ToolController::draws(tool) {
            return false;
        }
        if self.is_stroking() {
            self.end();
        }
        let label = match tool {
            Tool::Eraser => "Eraser Stroke",
            _ => "Brush Stroke",
        };
        history.checkpoint(surface, label);
        self.state = StrokeState::Stroking {
            tool,
            last: pos,
            segments: 0,
        };
        true
    }

    /// Pointer moved. Rasterizes the segment from the previous point; ignored
    /// while idle.
    pub fn extend(&mut self, surface: &mut PixelSurface, brush: &BrushSettings, pos: (f32, f32)) -> bool {
        let StrokeState::Stroking { tool, last, segments } = self.state else {
            return false;
        };
        draw_segment(
            surface.pixels_mut(),
            last,
            pos,
            brush.size.max(1) as f32,
            brush.paint_color(tool),
        );
        self.state = StrokeState::Stroking {
            tool,
            last: pos,
            segments: segments + 1,
        };
        true
    }

    /// Pointer released or left the canvas. No further checkpoint is taken.
    pub fn end(&mut self) -> bool {
        match std::mem::replace(&mut self.state, StrokeState::Idle) {
            StrokeState::Stroking { tool, segments, .. } => {
                tracing::debug!(tool = tool.id(), segments, "stroke finished");
                true
            }
            StrokeState::Idle => false,
        }
    }
}

/// Paint a round-capped segment of the given width. Pixels whose centre lies
/// within `width / 2` of the segment are set to `color`; consecutive segments
/// sharing an endpoint therefore join round.
fn draw_segment(image: &mut RgbaImage, start: (f32, f32), end: (f32, f32), width: f32, color: Rgba<u8>) {
    let (w, h) = image.dimensions();
    let radius = width / 2.0;
    let radius_sq = radius * radius;

    let min_x = (start.0.min(end.0) - radius).floor().max(0.0);
    let min_y = (start.1.min(end.1) - radius).floor().max(0.0);
    let max_x = (start.0.max(end.0) + radius).ceil().min(w as f32);
    let max_y = (start.1.max(end.1) + radius).ceil().min(h as f32);
    if min_x >= max_x || min_y >= max_y {
        return;
    }

    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let len_sq = dx * dx + dy * dy;

    for y in min_y as u32..max_y as u32 {
        let py = y as f32 + 0.5;
        for x in min_x as u32..max_x as u32 {
            let px = x as f32 + 0.5;
            // Project onto the segment, clamped to its endpoints.
            let t = if len_sq > f32::EPSILON {
                (((px - start.0) * dx + (py - start.1) * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let cx = start.0 + dx * t;
            let cy = start.1 + dy * t;
            let dist_sq = (px - cx) * (px - cx) + (py - cy) * (py - cy);
            if dist_sq <= radius_sq {
                image.put_pixel(x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYAN: Rgba<u8> = Rgba([0x06, 0xb6, 0xd4, 255]);

    fn setup() -> (PixelSurface, HistoryManager, StrokeEngine) {
        (PixelSurface::new(64, 64).unwrap(), HistoryManager::default(), StrokeEngine::new())
    }

    #[test]
    fn tool_ids_round_trip() {
        for tool in Tool::all() {
            assert_eq!(Tool::from_id(tool.id()), Some(*tool));
        }
        assert_eq!(Tool::from_id("pan"), Some(Tool::Hand));
        assert_eq!(Tool::from_id("lasso"), None);
    }

    #[test]
    fn only_brush_and_eraser_draw() {
        for tool in Tool::all() {
            let expected = matches!(tool, Tool::Brush | Tool::Eraser);
            assert_eq!(ToolController::draws(*tool), expected, "{tool:?}");
        }
        assert_eq!(ToolController::affordance(Tool::Hand).cursor, CursorHint::Grab);
    }

    #[test]
    fn parse_color_accepts_hex() {
        assert_eq!(BrushSettings::parse_color("#06b6d4"), Some([0x06, 0xb6, 0xd4]));
        assert_eq!(BrushSettings::parse_color("FF0000"), Some([255, 0, 0]));
        assert_eq!(BrushSettings::parse_color("#12345"), None);
        assert_eq!(BrushSettings::parse_color("#gg0000"), None);
        assert_eq!(BrushSettings::default().color_hex(), "#06b6d4");
    }

    #[test]
    fn brush_stroke_is_one_undo_step() {
        let (mut surface, mut history, mut strokes) = setup();
        let brush = BrushSettings::default();
        assert!(strokes.begin(&surface, &mut history, Tool::Brush, (10.0, 10.0)));
        for x in [20.0, 30.0, 40.0] {
            assert!(strokes.extend(&mut surface, &brush, (x, 10.0)));
        }
        assert!(strokes.end());

        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.undo_description(), Some("Brush Stroke"));
        assert_eq!(surface.pixel(25, 10), Some(CYAN));
        // Round cap reaches half the width past the end point.
        assert_eq!(surface.pixel(44, 10), Some(CYAN));
        assert_eq!(surface.pixel(46, 10), Some(BACKGROUND));
        assert_eq!(surface.pixel(25, 20), Some(BACKGROUND));
    }

    #[test]
    fn eraser_paints_background() {
        let (mut surface, mut history, mut strokes) = setup();
        let brush = BrushSettings::default();
        strokes.begin(&surface, &mut history, Tool::Brush, (5.0, 32.0));
        strokes.extend(&mut surface, &brush, (60.0, 32.0));
        strokes.end();

        strokes.begin(&surface, &mut history, Tool::Eraser, (32.0, 5.0));
        strokes.extend(&mut surface, &brush, (32.0, 60.0));
        strokes.end();

        assert_eq!(surface.pixel(32, 32), Some(BACKGROUND));
        assert_eq!(surface.pixel(10, 32), Some(CYAN));
        assert_eq!(history.undo_count(), 2);
    }

    #[test]
    fn non_drawing_tools_stay_idle() {
        let (surface, mut history, mut strokes) = setup();
        for tool in [Tool::Select, Tool::Hand, Tool::AiAdd, Tool::SmartEdit] {
            assert!(!strokes.begin(&surface, &mut history, tool, (1.0, 1.0)));
            assert_eq!(strokes.state(), StrokeState::Idle);
        }
        assert_eq!(history.undo_count(), 0);
    }

    #[test]
    fn move_while_idle_is_ignored() {
        let (mut surface, _, mut strokes) = setup();
        let before = surface.read_pixels();
        assert!(!strokes.extend(&mut surface, &BrushSettings::default(), (3.0, 3.0)));
        assert!(!strokes.end());
        assert_eq!(surface.read_pixels(), before);
    }

    #[test]
    fn segment_outside_surface_is_clipped() {
        let mut image = RgbaImage::from_pixel(8, 8, BACKGROUND);
        draw_segment(&mut image, (-20.0, -20.0), (-10.0, -10.0), 4.0, CYAN);
        assert!(image.pixels().all(|p| *p == BACKGROUND));
        draw_segment(&mut image, (-4.0, 4.0), (20.0, 4.0), 2.0, CYAN);
        assert_eq!(*image.get_pixel(0, 4), CYAN);
        assert_eq!(*image.get_pixel(7, 3), CYAN);
        assert_eq!(*image.get_pixel(7, 6), BACKGROUND);
    }
}

use uuid::Uuid;

use crate::canvas::PixelSurface;
use crate::components::history::HistoryManager;
use crate::components::tools::{BrushSettings, StrokeEngine, Tool, ToolAffordance, ToolController};
use crate::error::{CanvasError, CanvasResult};
use crate::ops::ai::{AiJobKind, AiJobResult, AiOutput};
use crate::ops::canvas_ops::{self, PlacedRect, Placement};
use crate::ops::filters::FilterSpec;
use crate::settings::EditorSettings;

/// Outcome of applying a finished AI job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AiApplied {
    Placed(PlacedRect),
    /// Video results never touch the canvas; the URI is handed to the player.
    Video(String),
}

/// The editing session behind the UI: one surface, its history, the active
/// tool and brush, and the last status line shown to the user.
///
/// The surface does not exist until `initialize`; until then every command
/// fails with `NotInitialized` except `undo`/`redo`, which report `false`.
/// A failing command leaves surface and history untouched and puts the
/// error in `status`.
pub struct Project {
    pub id: Uuid,
    surface: Option<PixelSurface>,
    history: HistoryManager,
    strokes: StrokeEngine,
    tool: Tool,
    brush: BrushSettings,
    status: String,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(HistoryManager::default())
    }
}

impl Project {
    pub fn new(history: HistoryManager) -> Self {
        Self {
            id: Uuid::new_v4(),
            surface: None,
            history,
            strokes: StrokeEngine::new(),
            tool: Tool::default(),
            brush: BrushSettings::default(),
            status: String::new(),
        }
    }

    /// Session configured from settings. Still needs `initialize`.
    pub fn from_settings(settings: &EditorSettings) -> Self {
        let mut project = Self::new(HistoryManager::new(settings.max_undo_steps));
        project.brush = settings.brush;
        project
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Create (or recreate) a white surface. History starts empty.
    pub fn initialize(&mut self, width: u32, height: u32) -> CanvasResult<()> {
        let surface = PixelSurface::new(width, height);
        let surface = self.track(surface)?;
        self.strokes.end();
        self.history.clear();
        self.surface = Some(surface);
        self.status = format!("Canvas {width}x{height}");
        tracing::info!(project = %self.id, width, height, "canvas initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.surface.is_some()
    }

    /// Follow the view size. Overlapping content is kept; history is dropped
    /// when the size changes since its snapshots no longer fit the surface.
    /// Re-sending the current size is a no-op.
    pub fn resize(&mut self, width: u32, height: u32) -> CanvasResult<()> {
        let result = self.surface_ref().map(|s| (s.width(), s.height()));
        let current = self.track(result)?;
        if current == (width, height) {
            return Ok(());
        }
        self.strokes.end();
        let result = self.surface_mut().and_then(|s| s.resize(width, height));
        self.track(result)?;
        self.history.clear();
        self.status = format!("Canvas {width}x{height}");
        Ok(())
    }

    pub fn surface(&self) -> Option<&PixelSurface> {
        self.surface.as_ref()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    pub fn undo(&mut self) -> bool {
        self.strokes.end();
        let Some(surface) = self.surface.as_mut() else { return false };
        let label = self.history.undo_description().map(str::to_owned);
        let done = self.history.undo(surface);
        self.status = match (done, label) {
            (true, Some(label)) => format!("Undo: {label}"),
            _ => "Nothing to undo".to_string(),
        };
        done
    }

    pub fn redo(&mut self) -> bool {
        self.strokes.end();
        let Some(surface) = self.surface.as_mut() else { return false };
        let label = self.history.redo_description().map(str::to_owned);
        let done = self.history.redo(surface);
        self.status = match (done, label) {
            (true, Some(label)) => format!("Redo: {label}"),
            _ => "Nothing to redo".to_string(),
        };
        done
    }

    pub fn can_undo(&self) -> bool {
        self.surface.is_some() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.surface.is_some() && self.history.can_redo()
    }

    // ========================================================================
    // COMPOSITING
    // ========================================================================

    pub fn apply_filter(&mut self, name: &str) -> CanvasResult<FilterSpec> {
        self.strokes.end();
        let result = self
            .parts()
            .and_then(|(surface, history)| canvas_ops::apply_named_filter(surface, history, name));
        let spec = self.track(result)?;
        self.status = format!("Applied {spec}");
        Ok(spec)
    }

    /// Drop an image onto the canvas, scaled into the centre half.
    pub fn add_image(&mut self, image_bytes: &[u8]) -> CanvasResult<PlacedRect> {
        self.insert(image_bytes, Placement::CenteredScaled)
    }

    /// Replace the canvas content with an image fitted to the whole surface.
    pub fn import_image(&mut self, image_bytes: &[u8]) -> CanvasResult<PlacedRect> {
        self.insert(image_bytes, Placement::FitCanvas)
    }

    fn insert(&mut self, image_bytes: &[u8], placement: Placement) -> CanvasResult<PlacedRect> {
        self.strokes.end();
        let result = self
            .parts()
            .and_then(|(surface, history)| canvas_ops::insert_image(surface, history, image_bytes, placement));
        let rect = self.track(result)?;
        self.status = match placement {
            Placement::CenteredScaled => "Image added".to_string(),
            Placement::FitCanvas => "Image imported".to_string(),
        };
        Ok(rect)
    }

    /// PNG of the current surface.
    pub fn get_encoded_surface(&mut self) -> CanvasResult<Vec<u8>> {
        let result = self.surface_ref().and_then(canvas_ops::export_for_editing);
        self.track(result)
    }

    /// Apply a finished AI job against the surface as it is now.
    pub fn apply_ai_result(&mut self, job: AiJobResult) -> CanvasResult<AiApplied> {
        let output = self.track(job.outcome)?;
        match (job.kind, output) {
            (_, AiOutput::VideoUri(uri)) => {
                self.status = "Video ready".to_string();
                Ok(AiApplied::Video(uri))
            }
            (AiJobKind::SmartEdit, AiOutput::Image(bytes)) => self.import_image(&bytes).map(AiApplied::Placed),
            (_, AiOutput::Image(bytes)) => self.add_image(&bytes).map(AiApplied::Placed),
        }
    }

    // ========================================================================
    // TOOLS & POINTER
    // ========================================================================

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        if tool != self.tool {
            self.strokes.end();
            tracing::debug!(tool = tool.id(), "tool selected");
        }
        self.tool = tool;
    }

    pub fn affordance(&self) -> ToolAffordance {
        ToolController::affordance(self.tool)
    }

    pub fn brush(&self) -> BrushSettings {
        self.brush
    }

    /// Takes effect from the next segment, including mid-stroke.
    pub fn set_brush(&mut self, brush: BrushSettings) {
        self.brush = BrushSettings::new(brush.size, brush.color);
    }

    /// Returns whether a stroke started.
    pub fn pointer_down(&mut self, x: f32, y: f32) -> CanvasResult<bool> {
        self.ensure_initialized()?;
        let Some(surface) = self.surface.as_ref() else { return Ok(false) };
        Ok(self.strokes.begin(surface, &mut self.history, self.tool, (x, y)))
    }

    /// Returns whether a segment was drawn.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> CanvasResult<bool> {
        self.ensure_initialized()?;
        let Some(surface) = self.surface.as_mut() else { return Ok(false) };
        Ok(self.strokes.extend(surface, &self.brush, (x, y)))
    }

    /// Returns whether a stroke ended.
    pub fn pointer_up(&mut self) -> CanvasResult<bool> {
        self.ensure_initialized()?;
        Ok(self.strokes.end())
    }

    pub fn pointer_leave(&mut self) -> CanvasResult<bool> {
        self.pointer_up()
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn surface_ref(&self) -> CanvasResult<&PixelSurface> {
        self.surface.as_ref().ok_or(CanvasError::NotInitialized)
    }

    fn surface_mut(&mut self) -> CanvasResult<&mut PixelSurface> {
        self.surface.as_mut().ok_or(CanvasError::NotInitialized)
    }

    fn parts(&mut self) -> CanvasResult<(&mut PixelSurface, &mut HistoryManager)> {
        match self.surface.as_mut() {
            Some(surface) => Ok((surface, &mut self.history)),
            None => Err(CanvasError::NotInitialized),
        }
    }

    /// Record a failure in the status line.
    fn track<T>(&mut self, result: CanvasResult<T>) -> CanvasResult<T> {
        if let Err(e) = &result {
            tracing::warn!(project = %self.id, "{e}");
            self.status = format!("Error: {e}");
        }
        result
    }

    fn ensure_initialized(&mut self) -> CanvasResult<()> {
        let result = self.surface_ref().map(|_| ());
        self.track(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io;
    use image::{Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        io::encode_png(&RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]))).unwrap()
    }

    #[test]
    fn commands_before_initialize() {
        let mut p = Project::default();
        assert!(!p.undo());
        assert!(!p.redo());
        assert!(matches!(p.apply_filter("none"), Err(CanvasError::NotInitialized)));
        assert!(matches!(p.add_image(&png(2, 2)), Err(CanvasError::NotInitialized)));
        assert!(matches!(p.import_image(&png(2, 2)), Err(CanvasError::NotInitialized)));
        assert!(matches!(p.get_encoded_surface(), Err(CanvasError::NotInitialized)));
        assert!(matches!(p.resize(10, 10), Err(CanvasError::NotInitialized)));
        assert!(matches!(p.pointer_down(1.0, 1.0), Err(CanvasError::NotInitialized)));
        assert!(matches!(p.pointer_move(2.0, 2.0), Err(CanvasError::NotInitialized)));
        assert!(matches!(p.pointer_up(), Err(CanvasError::NotInitialized)));
        assert!(p.status().contains("not initialized"));
    }

    #[test]
    fn failures_set_status_and_keep_state() {
        let mut p = Project::default();
        p.initialize(20, 20).unwrap();
        let before = p.surface().unwrap().read_pixels();

        assert!(p.apply_filter("posterize").is_err());
        assert!(p.status().contains("unknown filter"));
        assert!(p.add_image(b"garbage").is_err());
        assert!(p.status().contains("invalid image data"));
        assert!(p.initialize(0, 5).is_err());

        assert_eq!(p.surface().unwrap().read_pixels(), before);
        assert_eq!(p.history().undo_count(), 0);
    }

    #[test]
    fn stroke_is_one_undo_step() {
        let mut p = Project::default();
        p.initialize(50, 50).unwrap();
        assert!(p.pointer_down(5.0, 5.0).unwrap());
        for i in 1..10 {
            assert!(p.pointer_move(5.0 + i as f32 * 3.0, 5.0).unwrap());
        }
        assert!(p.pointer_up().unwrap());
        assert!(!p.pointer_up().unwrap());
        assert_eq!(p.history().undo_count(), 1);
        assert_ne!(p.surface().unwrap().pixel(20, 5), Some(crate::canvas::BACKGROUND));

        assert!(p.undo());
        assert_eq!(p.status(), "Undo: Brush Stroke");
        assert_eq!(p.surface().unwrap().pixel(20, 5), Some(crate::canvas::BACKGROUND));
    }

    #[test]
    fn non_drawing_tools_leave_history_alone() {
        let mut p = Project::default();
        p.initialize(20, 20).unwrap();
        p.set_tool(Tool::Hand);
        assert!(!p.pointer_down(1.0, 1.0).unwrap());
        assert!(!p.pointer_move(10.0, 10.0).unwrap());
        assert!(!p.pointer_leave().unwrap());
        assert_eq!(p.history().undo_count(), 0);
    }

    #[test]
    fn resize_clears_history() {
        let mut p = Project::default();
        p.initialize(20, 20).unwrap();
        p.apply_filter("invert").unwrap();
        p.resize(30, 10).unwrap();
        assert!(!p.can_undo());
        assert!(!p.undo());
        assert_eq!(p.surface().unwrap().width(), 30);
    }

    #[test]
    fn same_size_resize_keeps_history() {
        let mut p = Project::default();
        p.initialize(20, 20).unwrap();
        p.apply_filter("invert").unwrap();
        p.resize(20, 20).unwrap();
        assert!(p.can_undo());
        assert!(p.undo());
        assert_eq!(p.surface().unwrap().pixel(3, 3), Some(crate::canvas::BACKGROUND));
    }

    #[test]
    fn ai_results_route_by_kind() {
        let mut p = Project::default();
        p.initialize(100, 100).unwrap();

        let added = p
            .apply_ai_result(AiJobResult {
                kind: AiJobKind::AddImage,
                prompt: "sun".into(),
                outcome: Ok(AiOutput::Image(png(10, 10))),
            })
            .unwrap();
        assert_eq!(added, AiApplied::Placed(PlacedRect { x: 25, y: 25, width: 50, height: 50 }));

        let edited = p
            .apply_ai_result(AiJobResult {
                kind: AiJobKind::SmartEdit,
                prompt: "make it red".into(),
                outcome: Ok(AiOutput::Image(png(10, 10))),
            })
            .unwrap();
        assert_eq!(edited, AiApplied::Placed(PlacedRect { x: 0, y: 0, width: 100, height: 100 }));
        assert_eq!(p.history().undo_history(), vec!["Import Image".to_string(), "Add Image".to_string()]);

        let failed = p.apply_ai_result(AiJobResult {
            kind: AiJobKind::AddImage,
            prompt: "sun".into(),
            outcome: Err(CanvasError::service("quota")),
        });
        assert!(failed.is_err());
        assert!(p.status().contains("quota"));
        assert_eq!(p.history().undo_count(), 2);

        let video = p
            .apply_ai_result(AiJobResult {
                kind: AiJobKind::Video,
                prompt: "waves".into(),
                outcome: Ok(AiOutput::VideoUri("uri".into())),
            })
            .unwrap();
        assert_eq!(video, AiApplied::Video("uri".into()));
    }

    #[test]
    fn settings_seed_history_and_brush() {
        let mut settings = EditorSettings::default();
        settings.max_undo_steps = 3;
        settings.brush = BrushSettings::new(2, [1, 2, 3]);
        let p = Project::from_settings(&settings);
        assert_eq!(p.history().max_history_size(), 3);
        assert_eq!(p.brush(), settings.brush);
        assert!(!p.is_initialized());
    }
}

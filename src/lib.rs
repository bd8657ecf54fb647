//! Canvas engine for a browser-style creative editor: a single opaque RGBA
//! surface, bounded snapshot undo/redo, freehand strokes, whole-surface
//! filters and image compositing, plus the seams to external AI services.
#![forbid(unsafe_code)]

pub mod canvas;
pub mod cli;
pub mod components;
pub mod error;
pub mod io;
pub mod logger;
pub mod ops;
pub mod project;
pub mod settings;

pub use canvas::{BACKGROUND, PixelSurface, Snapshot};
pub use components::history::{HistoryManager, MAX_HISTORY};
pub use components::tools::{BrushSettings, StrokeEngine, Tool, ToolController};
pub use error::{CanvasError, CanvasResult};
pub use ops::canvas_ops::{PlacedRect, Placement};
pub use ops::filters::FilterSpec;
pub use project::Project;
pub use settings::EditorSettings;

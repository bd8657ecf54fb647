//! Editor settings, persisted as a plain `key=value` file.
//!
//! Location:
//!   Windows:  `%APPDATA%\studio-canvas\settings.cfg`
//!   Linux:    `~/.local/share/studio-canvas/settings.cfg`
//!   macOS:    `~/Library/Application Support/studio-canvas/settings.cfg`
//!
//! A missing or unreadable file yields defaults. Unknown keys are ignored and
//! a malformed value falls back to that key's default.

use std::fs;
use std::path::{Path, PathBuf};

use crate::components::history::MAX_HISTORY;
use crate::components::tools::BrushSettings;
use crate::error::CanvasResult;

/// Folder under the platform data directory.
pub const APP_DIR: &str = "studio-canvas";
pub const SETTINGS_FILE: &str = "settings.cfg";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorSettings {
    pub max_undo_steps: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub brush: BrushSettings,
    /// Default filter directive for the session log.
    pub log_level: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            max_undo_steps: MAX_HISTORY,
            canvas_width: 800,
            canvas_height: 600,
            brush: BrushSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl EditorSettings {
    pub fn settings_path() -> PathBuf {
        data_dir().join(APP_DIR).join(SETTINGS_FILE)
    }

    /// Load from the default location.
    pub fn load() -> Self {
        Self::load_from(&Self::settings_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults: {e}");
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "max_undo_steps" => {
                    if let Ok(v) = val.parse::<usize>()
                        && v > 0
                    {
                        s.max_undo_steps = v;
                    }
                }
                "canvas_width" => {
                    if let Ok(v) = val.parse::<u32>()
                        && v > 0
                    {
                        s.canvas_width = v;
                    }
                }
                "canvas_height" => {
                    if let Ok(v) = val.parse::<u32>()
                        && v > 0
                    {
                        s.canvas_height = v;
                    }
                }
                "brush_size" => {
                    if let Ok(v) = val.parse::<u32>()
                        && v > 0
                    {
                        s.brush.size = v;
                    }
                }
                "brush_color" => {
                    if let Some(c) = BrushSettings::parse_color(val) {
                        s.brush.color = c;
                    }
                }
                "log_level" => {
                    if !val.is_empty() {
                        s.log_level = val.to_string();
                    }
                }
                other => tracing::debug!(key = other, "ignoring unknown setting"),
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "max_undo_steps={}\ncanvas_width={}\ncanvas_height={}\nbrush_size={}\nbrush_color={}\nlog_level={}\n",
            self.max_undo_steps,
            self.canvas_width,
            self.canvas_height,
            self.brush.size,
            self.brush.color_hex(),
            self.log_level,
        )
    }

    /// Save to the default location.
    pub fn save(&self) -> CanvasResult<()> {
        self.save_to(&Self::settings_path())
    }

    pub fn save_to(&self, path: &Path) -> CanvasResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_config_string())?;
        Ok(())
    }
}

/// Platform data directory (without the app sub-folder).
pub fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

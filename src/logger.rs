//! Session logger. Routes `tracing` output to a single file in the OS data
//! directory.
//!
//! The file is **truncated at each launch**, so it only ever contains output
//! from the most recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\studio-canvas\studio-canvas.log`
//!   Linux:    `~/.local/share/studio-canvas/studio-canvas.log`
//!   macOS:    `~/Library/Application Support/studio-canvas/studio-canvas.log`
//!
//! The level comes from `RUST_LOG` when set, otherwise from the caller.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing_subscriber::EnvFilter;

use crate::settings::{APP_DIR, data_dir};

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Path of the current session log, once `init` succeeded.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

pub fn log_file_path() -> PathBuf {
    data_dir().join(APP_DIR).join("studio-canvas.log")
}

/// Initialise the session logger at the default location.
pub fn init(default_level: &str, echo_stderr: bool) {
    init_at(&log_file_path(), default_level, echo_stderr);
}

/// Initialise the session logger.
///
/// * Creates (or truncates) the log file at `path`.
/// * With `echo_stderr`, lines also go to stderr (CLI `--verbose`).
/// * Installs a panic hook that mirrors the panic message to the log before
///   running the previous handler.
///
/// Failing to open the file is not fatal; logging falls back to stderr.
pub fn init_at(path: &Path, default_level: &str, echo_stderr: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file = open_truncated(path);
    let installed = match file {
        Ok(file) if !echo_stderr => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Arc::new(file))
            .try_init()
            .is_ok(),
        Ok(file) => {
            use tracing_subscriber::fmt::writer::MakeWriterExt;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Arc::new(file).and(std::io::stderr))
                .try_init()
                .is_ok()
        }
        Err(e) => {
            eprintln!("[logger] Failed to open log file {}: {}", path.display(), e);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .is_ok()
        }
    };
    if !installed {
        // A subscriber is already set (tests, embedding host).
        return;
    }

    let _ = LOG_PATH.set(path.to_path_buf());
    tracing::info!("=== studio-canvas session started ===");
    tracing::info!("log file: {}", path.display());

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC: {info}");
        prev(info);
    }));
}

fn open_truncated(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).write(true).truncate(true).open(path)
}

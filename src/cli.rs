// ============================================================================
// studio-canvas CLI — headless batch processing via command-line arguments
// ============================================================================
//
// Usage examples:
//   studio-canvas --input photo.png --filter grayscale --output result.png
//   studio-canvas -i photo.jpg -F "blur(2px)" -F "contrast(150%)" -o out.jpg
//   studio-canvas -i "shots/*.png" --overlay logo.png --output-dir processed/
//   studio-canvas -i scan.bmp --fit -o framed.png
//
// Each input goes through the same command surface the editor uses: import,
// filters in order, optional overlay, then save.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::error::{CanvasError, CanvasResult};
use crate::io::{self, SaveFormat};
use crate::ops::filters::FilterSpec;
use crate::project::Project;
use crate::settings::EditorSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// studio-canvas headless image processor.
#[derive(Parser, Debug)]
#[command(
    name = "studio-canvas",
    about = "Apply canvas filters and overlays to image files without the editor",
    long_about = "Run images through the canvas engine: filters (none, grayscale, sepia,\n\
                  invert, blur, brightness, contrast), a centred overlay, and fit-to-canvas\n\
                  import. Reads PNG, JPEG, WEBP and BMP; writes PNG, JPEG and BMP.\n\n\
                  Example:\n  \
                  studio-canvas --input photo.png --filter grayscale --output result.png\n  \
                  studio-canvas -i \"*.jpg\" -F sepia --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Filter to apply, CSS syntax. Repeat to chain; applied in order.
    #[arg(short = 'F', long = "filter", value_name = "FILTER")]
    pub filters: Vec<String>,

    /// Image composited centred into the middle half of each result.
    #[arg(long, value_name = "FILE")]
    pub overlay: Option<PathBuf>,

    /// Fit each input onto a fresh canvas of the configured size instead of
    /// keeping the input's own dimensions.
    #[arg(long)]
    pub fit: bool,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, bmp. Inferred from --output when omitted.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1-100).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    /// Echo log output and per-file timing to the terminal.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs, settings: &EditorSettings) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    // Validate every filter before touching any file.
    let filters = match args.filters.iter().map(|f| FilterSpec::parse(f)).collect::<CanvasResult<Vec<_>>>() {
        Ok(filters) => filters,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let save_format = match parse_format(args.format.as_deref(), args.output.as_deref()) {
        Some(format) => format,
        None => {
            eprintln!("error: unsupported output format '{}'.", args.format.as_deref().unwrap_or_default());
            return ExitCode::FAILURE;
        }
    };

    let overlay: Option<Vec<u8>> = match &args.overlay {
        Some(path) => match io::read_image_file(path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                eprintln!("error: could not read overlay '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let job = Job {
        filters: &filters,
        overlay: overlay.as_deref(),
        fit: args.fit,
        format: save_format,
        quality: args.quality,
        settings,
    };

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let Some(output_path) =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref(), save_format)
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &job) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                tracing::warn!(input = %input_path.display(), "{e}");
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

struct Job<'a> {
    filters: &'a [FilterSpec],
    overlay: Option<&'a [u8]>,
    fit: bool,
    format: SaveFormat,
    quality: u8,
    settings: &'a EditorSettings,
}

fn run_one(input: &Path, output: &Path, job: &Job<'_>) -> CanvasResult<()> {
    let bytes = io::read_image_file(input)?;

    // -- Step 1: Load onto a canvas ----------------------------------------
    let (width, height) = if job.fit {
        (job.settings.canvas_width, job.settings.canvas_height)
    } else {
        io::encoded_dimensions(&bytes)?
    };
    let mut project = Project::from_settings(job.settings);
    project.initialize(width, height)?;
    project.import_image(&bytes)?;

    // -- Step 2: Filters, in order -----------------------------------------
    for spec in job.filters {
        project.apply_filter(&spec.to_string())?;
    }

    // -- Step 3: Overlay -----------------------------------------------------
    if let Some(overlay) = job.overlay {
        project.add_image(overlay)?;
    }

    // -- Step 4: Save --------------------------------------------------------
    let surface = project.surface().ok_or(CanvasError::NotInitialized)?;
    io::encode_and_write(surface.as_image(), output, job.format, job.quality)
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
pub fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the format from `--format` or the output extension. PNG when
/// neither says otherwise; `None` for an explicit format we cannot write.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Option<SaveFormat> {
    if let Some(f) = format_arg {
        return SaveFormat::from_extension(f);
    }
    let ext = output.and_then(|o| o.extension()).and_then(|e| e.to_str()).unwrap_or("");
    Some(SaveFormat::from_extension(ext).unwrap_or_default())
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(input: &Path, output: Option<&Path>, output_dir: Option<&Path>, format: SaveFormat) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

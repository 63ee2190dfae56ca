// ============================================================================
// pixelops CLI: headless batch filtering via command-line arguments
// ============================================================================
//
// Usage examples:
//   pixelops -i photo.png -f rotate -s angle_deg=30 -o rotated.png
//   pixelops -i "shots/*.png" -p soft-shadow.preset --output-dir out/
//   pixelops -i base.png -f composite --overlay top.png -s mode=hard-light -o mixed.png
//   pixelops -f halftone --list-params

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::buffer::PixelBuffer;
use crate::config::{self, Operation};
use crate::io::{SaveFormat, load_buffer, save_buffer};
use crate::logger;
use crate::{log_err, log_info};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// pixelops headless image filter.
#[derive(Parser, Debug)]
#[command(
    name = "pixelops",
    about = "Apply pixel-buffer filters to image files",
    long_about = "Rotate, halftone, blur, drop-shadow or blend-composite image files\n\
                  without a GUI. Parameters come from a preset file and/or --set\n\
                  overrides; --list-params shows what each filter accepts.\n\n\
                  Example:\n  \
                  pixelops -i photo.png -f shadow -s radius=8 -s add_margins=true -o out.png\n  \
                  pixelops -i \"*.jpg\" -p halftone.preset --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    /// For `composite` each input is the destination the overlay is drawn onto.
    #[arg(short, long, num_args = 1.., required_unless_present = "list_params")]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Operation: rotate, halftone, shadow, blur, composite.
    /// Overrides the preset's `filter=` line when both are given.
    #[arg(short, long, value_name = "NAME")]
    pub filter: Option<String>,

    /// Preset file of `key=value` lines (see --list-params for keys).
    #[arg(short, long, value_name = "FILE")]
    pub preset: Option<PathBuf>,

    /// Parameter override, repeatable: `-s radius=4 -s angle_deg=45`.
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Source image blended onto each input by `composite`.
    #[arg(long, value_name = "FILE")]
    pub overlay: Option<PathBuf>,

    /// Output format: png, jpeg, webp, bmp, tga, tiff.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100, default 90).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    /// Print the selected operation's parameters and exit.
    #[arg(long)]
    pub list_params: bool,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,

    /// Session log file. Defaults to $PIXELOPS_LOG, then the platform data directory.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let op = match resolve_operation(&args) {
        Ok(op) => op,
        Err(e) => {
            eprintln!("error: {}", e);
            log_err!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.list_params {
        println!("{} parameters:", op.name());
        for d in op.descriptors() {
            println!("  {}", d.describe());
        }
        return ExitCode::SUCCESS;
    }

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

    let overlay = match (&op, &args.overlay) {
        (Operation::Composite(_), Some(path)) => match load_buffer(path) {
            Ok(buf) => Some(buf),
            Err(e) => {
                eprintln!("error: could not load overlay '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        (Operation::Composite(_), None) => {
            eprintln!("error: composite needs --overlay <FILE>.");
            return ExitCode::FAILURE;
        }
        (_, Some(_)) => {
            eprintln!("warning: --overlay is only used by composite; ignoring it.");
            None
        }
        (_, None) => None,
    };

    let save_format = match parse_format(args.format.as_deref(), args.output.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;
    log_info!("batch: {} on {} file(s)", op.name(), total);

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let Some(output_path) = build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            save_format,
        ) else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &op, overlay.as_ref(), save_format, args.quality) {
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
                eprintln!("  error: {}", e);
                log_err!("{}: {}", input_path.display(), e);
                any_failure = true;
            }
        }
    }

    if let Some(path) = logger::log_path()
        && (any_failure || args.verbose)
    {
        let (warnings, errors) = logger::counts();
        eprintln!("log: {} ({} warning(s), {} error(s))", path.display(), warnings, errors);
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

/// Preset first, then `--filter` (which replaces the preset's choice only
/// if it names a different operation), then `--set` overrides.
fn resolve_operation(args: &CliArgs) -> Result<Operation, String> {
    let from_preset = match &args.preset {
        Some(path) => Some(
            config::load_preset(path)
                .map_err(|e| format!("preset '{}': {}", path.display(), e))?,
        ),
        None => None,
    };

    let mut op = match (from_preset, args.filter.as_deref()) {
        (Some(op), Some(name)) if op.name() == name.trim().to_lowercase() => op,
        (_, Some(name)) => Operation::from_name(name).ok_or_else(|| {
            format!(
                "unknown filter '{}' (expected one of: {})",
                name,
                Operation::all_names().join(", ")
            )
        })?,
        (Some(op), None) => op,
        (None, None) => return Err("no operation given; use --filter or --preset.".to_string()),
    };

    op.apply_overrides(&args.set[..]).map_err(|e| format!("--set: {}", e))?;
    Ok(op)
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(
    input: &Path,
    output: &Path,
    op: &Operation,
    overlay: Option<&PixelBuffer>,
    format: SaveFormat,
    quality: u8,
) -> Result<(), String> {
    // -- Step 1: Load ----------------------------------------------------
    let src = load_buffer(input).map_err(|e| format!("load failed: {}", e))?;

    // -- Step 2: Apply ---------------------------------------------------
    let result = match op {
        Operation::Filter(f) => f.filter(&src, None).map_err(|e| format!("filter failed: {}", e))?,
        Operation::Composite(c) => {
            let overlay = overlay.ok_or_else(|| "composite needs an overlay".to_string())?;
            let mut dst = src;
            c.compose(overlay, &mut dst)
                .map_err(|e| format!("composite failed: {}", e))?;
            dst
        }
    };

    // -- Step 3: Save ----------------------------------------------------
    save_buffer(&result, output, format, quality).map_err(|e| format!("save failed: {}", e))
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
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

/// Choose the [`SaveFormat`] from `--format`, else from the output file
/// extension, else PNG.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<SaveFormat, String> {
    if let Some(f) = format_arg {
        return SaveFormat::from_name(f).ok_or_else(|| format!("unsupported output format '{}'", f));
    }
    Ok(output.and_then(SaveFormat::from_path).unwrap_or_default())
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: next to the input as `<stem>_out.<ext>`
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{}_out.{}", stem, ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Filter;

    fn args(list: &[&str]) -> CliArgs {
        CliArgs::parse_from(std::iter::once("pixelops").chain(list.iter().copied()))
    }

    #[test]
    fn filter_and_overrides_build_the_operation() {
        let a = args(&["-i", "x.png", "-f", "blur", "-s", "radius=4", "--set", "edge_action=zero"]);
        let op = resolve_operation(&a).unwrap();
        let Operation::Filter(Filter::Blur(p)) = op else { panic!("{:?}", op) };
        assert_eq!(p.radius, 4.0);
    }

    #[test]
    fn missing_or_unknown_operation_is_reported() {
        assert!(resolve_operation(&args(&["-i", "x.png"])).is_err());
        let err = resolve_operation(&args(&["-i", "x.png", "-f", "sharpen"])).unwrap_err();
        assert!(err.contains("sharpen"), "{err}");
    }

    #[test]
    fn list_params_does_not_need_inputs() {
        let a = args(&["-f", "halftone", "--list-params"]);
        assert!(a.list_params && a.input.is_empty());
        assert_eq!(a.log_file, None);
        let b = args(&["-i", "x.png", "-f", "blur", "--log-file", "run.log"]);
        assert_eq!(b.log_file, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn output_paths_and_formats() {
        let input = Path::new("shots/a.jpg");
        assert_eq!(
            build_output_path(input, None, Some(Path::new("out")), SaveFormat::Png),
            Some(PathBuf::from("out/a.png"))
        );
        assert_eq!(
            build_output_path(input, None, None, SaveFormat::Jpeg),
            Some(PathBuf::from("shots/a_out.jpg"))
        );
        assert_eq!(parse_format(None, Some(Path::new("o.TIF"))), Ok(SaveFormat::Tiff));
        assert_eq!(parse_format(None, None), Ok(SaveFormat::Png));
        assert!(parse_format(Some("gif"), None).is_err());
    }
}

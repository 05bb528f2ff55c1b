//! Command-line interface implementation
//!
//! Parses arguments, wires a progress sink to the pipeline, and maps the
//! typed pipeline errors to exit codes and stderr messages.

use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::color::{parse_key_color, KeyColor};
use crate::pipeline::{Options, Pipeline, PipelineError};
use crate::progress::ProgressSink;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Gifkey - remove a solid-color background from an animated GIF
#[derive(Parser)]
#[command(name = "gifkey")]
#[command(about = "Gifkey - chroma-key a background color out of an animated GIF")]
#[command(version)]
pub struct Cli {
    /// Input animated GIF
    pub input: PathBuf,

    /// Output file.
    /// If omitted: {input}_keyed.gif next to the input
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Background color to remove: white, green, black, #RRGGBB, #RGB, or R,G,B
    #[arg(short, long, default_value = "white", value_parser = parse_key_color)]
    pub color: KeyColor,

    /// Matching tolerance in raw 0-255 channel units (same scale as the
    /// color channels, not a percentage)
    #[arg(short, long, default_value = "30")]
    pub tolerance: u8,

    /// Progress output style
    #[arg(long, default_value = "auto", value_enum)]
    pub progress: ProgressMode,

    /// Suppress the completion summary
    #[arg(short, long)]
    pub quiet: bool,
}

/// How per-frame progress is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProgressMode {
    /// One `frame N/M` line per frame on stderr
    Auto,
    /// No progress output
    Off,
    /// One JSON object per frame on stdout, e.g. {"current":1,"total":5}
    Json,
}

/// One per-frame progress record on the JSON stream.
#[derive(Debug, Serialize)]
struct ProgressEvent {
    current: usize,
    total: usize,
}

/// Renders `frame N/M` lines to stderr.
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn frame_done(&mut self, current: usize, total: usize) {
        eprintln!("frame {}/{}", current, total);
    }
}

/// Emits one JSON line per frame to the wrapped writer for machine consumers.
struct JsonProgress<W: std::io::Write> {
    out: W,
}

impl<W: std::io::Write> ProgressSink for JsonProgress<W> {
    fn frame_done(&mut self, current: usize, total: usize) {
        let event = ProgressEvent { current, total };
        match serde_json::to_string(&event) {
            Ok(line) => {
                let _ = writeln!(self.out, "{}", line);
            }
            Err(err) => eprintln!("progress serialization failed: {}", err),
        }
    }
}

/// Default output path: `{stem}_keyed.gif` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let name = format!("{}_keyed.gif", stem);
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

/// CLI entry point.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    execute(cli)
}

fn execute(cli: Cli) -> ExitCode {
    let output = cli.output.clone().unwrap_or_else(|| default_output_path(&cli.input));
    let options = Options {
        input: cli.input,
        output: output.clone(),
        color: cli.color,
        tolerance: cli.tolerance,
    };

    let mut console = ConsoleProgress;
    let mut json = JsonProgress { out: std::io::stdout() };

    let mut pipeline = Pipeline::new(options);
    match cli.progress {
        ProgressMode::Auto => pipeline = pipeline.with_progress(&mut console),
        ProgressMode::Json => pipeline = pipeline.with_progress(&mut json),
        ProgressMode::Off => {}
    }

    match pipeline.run() {
        Ok(summary) => {
            if !cli.quiet {
                eprintln!(
                    "Wrote {} ({} frames, {}x{}, loop {})",
                    output.display(),
                    summary.frames,
                    summary.width,
                    summary.height,
                    if summary.loop_count == 0 {
                        "forever".to_string()
                    } else {
                        summary.loop_count.to_string()
                    },
                );
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            let code = match err {
                PipelineError::Invalid(_) => EXIT_INVALID_ARGS,
                _ => EXIT_ERROR,
            };
            ExitCode::from(code)
        }
    }
}

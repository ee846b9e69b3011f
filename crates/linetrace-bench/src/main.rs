//! linetrace-bench: run the perception pipeline on captured frames.
//!
//! Processes one or more image files through the pipeline with
//! configurable parameters, printing per-frame diagnostics and timing.
//! Useful for:
//!
//! - Replaying a recorded lap frame by frame and watching the ring
//!   phase walk through its transitions
//! - Tuning the bridge gap tolerance against crossroad captures
//! - Measuring steady-state per-frame latency
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin linetrace-bench -- [OPTIONS] <FRAME_PATH>...
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use linetrace_pipeline::{PipelineConfig, TrackPipeline};

/// Run the linetrace perception pipeline on captured frames.
///
/// Frames are processed in argument order through a single pipeline
/// instance, so ring-navigation state carries across them exactly as
/// it would on the robot.
#[derive(Parser)]
#[command(name = "linetrace-bench", version)]
struct Cli {
    /// Paths to the input frames (PNG, JPEG, BMP), in capture order.
    #[arg(required = true)]
    frame_paths: Vec<PathBuf>,

    /// Gap tolerance for the crossroad pattern matcher.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BRIDGE_MAX_GAP)]
    bridge_max_gap: u16,

    /// Disable the ring navigation state machine.
    #[arg(long)]
    no_ring: bool,

    /// Repeat the whole frame sequence this many times (for timing).
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Write the annotated output of the last frame as PNG.
    #[arg(long)]
    annotated: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut frames = Vec::with_capacity(cli.frame_paths.len());
    for path in &cli.frame_paths {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("Error reading {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        };
        match linetrace_io::decode_frame(&bytes) {
            Ok(frame) => frames.push(frame),
            Err(e) => {
                eprintln!("Error decoding {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    let config = PipelineConfig {
        bridge_max_gap: cli.bridge_max_gap,
        ring_nav: !cli.no_ring,
        ..PipelineConfig::default()
    };
    let mut pipeline = TrackPipeline::with_config(config);

    let mut durations_ms: Vec<f64> = Vec::with_capacity(cli.runs * frames.len());
    let mut last_annotated = None;

    for run in 0..cli.runs {
        for (frame, path) in frames.iter().zip(&cli.frame_paths) {
            let started = Instant::now();
            let output = pipeline.process(frame);
            durations_ms.push(started.elapsed().as_secs_f64() * 1000.0);

            // Report only on the first pass; later runs are timing-only.
            if run == 0 {
                if cli.json {
                    match serde_json::to_string_pretty(&output.diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("--- {} ---", path.display());
                    print!("{}", output.diagnostics.report());
                }
                last_annotated = Some(output.annotated);
            }
        }
    }

    if let Some(ref annotated_path) = cli.annotated
        && let Some(ref annotated) = last_annotated
    {
        match linetrace_io::encode_annotated_png(annotated) {
            Ok(png) => {
                if let Err(e) = std::fs::write(annotated_path, &png) {
                    eprintln!("Error writing {}: {e}", annotated_path.display());
                    return ExitCode::FAILURE;
                }
                eprintln!(
                    "Annotated frame written to {} ({} bytes)",
                    annotated_path.display(),
                    png.len(),
                );
            }
            Err(e) => {
                eprintln!("Error encoding annotated frame: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    print_timing_summary(&durations_ms);
    ExitCode::SUCCESS
}

/// Print min/mean/max per-frame latency across all runs.
#[allow(clippy::cast_precision_loss)]
fn print_timing_summary(durations_ms: &[f64]) {
    if durations_ms.is_empty() {
        return;
    }
    let min = durations_ms.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations_ms.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations_ms.iter().sum::<f64>() / durations_ms.len() as f64;
    println!();
    println!(
        "{} frame(s): min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms",
        durations_ms.len(),
    );
}

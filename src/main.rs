mod config;
mod error;
mod manifest;
mod pipeline;
mod range;
mod recordings;
mod transcoder;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use config::{AudioCodec, PipelineConfig, Preset, SegmentMode, VideoCodec};
use error::ErrorKind;
use pipeline::RunSummary;
use std::path::{Path, PathBuf};
use transcoder::FfmpegTranscoder;

#[derive(Parser)]
#[command(
    name = "dvrstitch",
    version,
    about = "Process recorded DVR footage from an Eachine LCD5802D FPV receiver into one compressed video"
)]
struct Cli {
    /// Folder CONTAINING the DCIM folder where the DVR recordings are stored.
    #[arg(value_name = "INPUT")]
    source_path: PathBuf,

    /// Recordings to include, inclusive. Either side may be left empty (e.g. "5:" or ":").
    #[arg(value_name = "START:END")]
    input_range: String,

    /// Where to write the output file.
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Path to the FFmpeg executable.
    #[arg(long, value_name = "PATH", default_value = "ffmpeg", env = "DVRSTITCH_FFMPEG")]
    ffmpeg_path: PathBuf,

    /// Output video codec.
    #[arg(long, value_enum, default_value_t = VideoCodec::H264)]
    codec: VideoCodec,

    /// Quality (CRF). Default: 22 for h264, 28 for h265.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=51))]
    crf: Option<u8>,

    /// Encoder preset, ultrafast (biggest file) to veryslow (smallest).
    #[arg(long, value_enum, default_value_t = Preset::Medium)]
    preset: Preset,

    /// Output audio codec (mono, low sample rate).
    #[arg(long, value_enum, default_value_t = AudioCodec::Aac)]
    audio_codec: AudioCodec,

    /// Encode H.264 baseline@3.0 for old or constrained players (overrides --codec).
    #[arg(long, default_value_t = false)]
    compat: bool,

    /// How recordings are prepared for joining: pad (fix audio drift), lossless (FFV1), copy.
    #[arg(long, value_enum, default_value_t = SegmentMode::Pad)]
    segment_mode: SegmentMode,

    /// Recordings prepared concurrently.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    jobs: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if cli.output.exists() {
        println!("Output file '{}' already exists!", cli.output.display());
        return Ok(());
    }

    let input_files = match select_inputs(&cli.source_path, &cli.input_range) {
        Ok(files) => files,
        Err(err) if err.is_user_error() => {
            report_user_error(&err, &cli.input_range);
            return Ok(());
        }
        Err(err) => {
            return Err(err).with_context(|| {
                format!("failed to read recordings in '{}'", cli.source_path.display())
            })
        }
    };

    let config = PipelineConfig::new(
        cli.ffmpeg_path,
        cli.codec,
        cli.audio_codec,
        cli.crf,
        cli.preset,
        cli.compat,
        cli.segment_mode,
        cli.jobs as usize,
    );

    util::ensure_ffmpeg_available(&config.ffmpeg_path).context("ffmpeg not found")?;

    print_plan(&config, &input_files, &cli.output);

    let ffmpeg = FfmpegTranscoder::new(&config.ffmpeg_path);
    let summary = pipeline::join_and_compress(&ffmpeg, &config, &input_files, &cli.output)
        .with_context(|| format!("failed to produce '{}'", cli.output.display()))?;

    print_run_summary(&summary);
    Ok(())
}

fn select_inputs(source_path: &Path, input_range: &str) -> error::Result<Vec<PathBuf>> {
    let recordings = recordings::find_recordings(source_path)?;
    if recordings.is_empty() {
        return Err(error::Error::NoRecordings);
    }
    let spec = range::parse_range(input_range)?;
    range::select_recordings(input_range, &spec, &recordings)
}

fn report_user_error(err: &error::Error, input_range: &str) {
    match err.kind() {
        ErrorKind::Configuration => println!("Could not locate video files: {}", err),
        ErrorKind::Format => println!("Invalid range '{}': {}", input_range, err),
        _ => println!("Nothing to process: {}", err),
    }
}

fn print_plan(config: &PipelineConfig, input_files: &[PathBuf], output: &Path) {
    println!("*** Eachine LCD5802D Video Extractor ***");
    println!("FFMPEG path:\n  '{}'", config.ffmpeg_path.display());
    println!("Settings:\n  {}", config);
    println!("Input:");
    for path in input_files {
        println!("  '{}'", path.display());
    }
    println!("Output:\n  '{}'", output.display());
}

fn print_run_summary(summary: &RunSummary) {
    log::debug!("removed workspace {}", summary.workspace.display());
    let stages: Vec<String> = summary.stages.iter().map(ToString::to_string).collect();
    println!(
        "Finished processing in {} (segments={} ffmpeg_runs={} stages=[{}] output={})",
        util::fmt_duration(summary.elapsed),
        summary.segment_count,
        summary.invocations,
        stages.join(", "),
        summary.output.display(),
    );
}

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info};
use tempfile::TempDir;

use crate::config::{PipelineConfig, SegmentMode};
use crate::error::{Error, Result};
use crate::manifest::ConcatManifest;
use crate::transcoder::{FfmpegArgs, Transcoder};

/// DVR recordings are cut every 5 minutes; anything longer is junk at the
/// end of a file the receiver failed to close.
const SEGMENT_TIME_LIMIT_SECS: &str = "300";
const KEYFRAME_INTERVAL: &str = "150";
const B_FRAMES: &str = "3";
const PIX_FMT: &str = "yuv420p";
const FFV1_SLICES: &str = "24";
const AUDIO_PAD_FILTER: &str = "aresample=async=1:first_pts=0,apad";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NormalizeSegments,
    Concatenate,
    FinalEncode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::NormalizeSegments => "segment normalization",
            Stage::Concatenate => "concatenate",
            Stage::FinalEncode => "final encode",
        })
    }
}

/// Scratch directory for the intermediates of one run. Removed with all its
/// contents when dropped, whichever way the run ends.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("dvrstitch-").tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn segment_path(&self, position: usize) -> PathBuf {
        self.path().join(format!("segment{:03}.mkv", position))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path().join("concat.txt")
    }

    pub fn concat_path(&self) -> PathBuf {
        self.path().join("concat.mkv")
    }

    /// Removes the directory now, reporting failures instead of ignoring them.
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub segment_count: usize,
    /// Scratch directory the run used. Already removed.
    pub workspace: PathBuf,
    pub output: PathBuf,
    /// Stages that completed, in the order they finished.
    pub stages: Vec<Stage>,
    /// Successful transcoder runs across all stages.
    pub invocations: usize,
    pub elapsed: Duration,
}

/// Wraps a transcoder and tallies what actually ran.
struct RunLog<'a> {
    inner: &'a dyn Transcoder,
    runs: AtomicUsize,
    stages: Mutex<Vec<Stage>>,
}

impl<'a> RunLog<'a> {
    fn new(inner: &'a dyn Transcoder) -> Self {
        Self {
            inner,
            runs: AtomicUsize::new(0),
            stages: Mutex::new(Vec::new()),
        }
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::Relaxed)
    }

    fn stages(&self) -> Vec<Stage> {
        self.stages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Transcoder for RunLog<'_> {
    fn run(&self, stage: Stage, args: &[OsString]) -> Result<()> {
        self.inner.run(stage, args)?;
        self.runs.fetch_add(1, Ordering::Relaxed);
        let mut stages = self.stages.lock().unwrap_or_else(PoisonError::into_inner);
        if stages.last() != Some(&stage) {
            stages.push(stage);
        }
        Ok(())
    }
}

pub fn segment_args(
    config: &PipelineConfig,
    input: &Path,
    output: &Path,
    threads: usize,
) -> Vec<OsString> {
    let mut args = FfmpegArgs::new();
    args.arg("-y")
        .opt("-i", input)
        .opt("-t", SEGMENT_TIME_LIMIT_SECS);

    match config.segment_mode {
        SegmentMode::Pad => {
            // Padding needs decoded audio, so it cannot be stream-copied.
            let audio = config.audio_codec;
            args.opt("-c:v", "copy")
                .opt("-af", AUDIO_PAD_FILTER)
                .arg("-shortest")
                .opt("-c:a", audio.encoder())
                .opt("-ac", "1")
                .opt("-ar", audio.sample_rate().to_string());
        }
        SegmentMode::Lossless => {
            // FFV1 intra-only, so every frame is a clean cut point
            args.opt("-c:a", "copy")
                .opt("-c:v", "ffv1")
                .opt("-level", "3")
                .opt("-coder", "1")
                .opt("-context", "1")
                .opt("-g", "1")
                .opt("-slices", FFV1_SLICES)
                .opt("-slicecrc", "1")
                .opt("-threads", threads.to_string());
        }
        SegmentMode::Copy => {
            args.opt("-c:a", "copy").opt("-c:v", "copy");
        }
    }

    args.arg(output);
    args.into_vec()
}

pub fn concat_args(manifest: &Path, output: &Path) -> Vec<OsString> {
    let mut args = FfmpegArgs::new();
    args.arg("-y")
        .opt("-f", "concat")
        .opt("-safe", "0")
        .opt("-i", manifest)
        .opt("-c:a", "copy")
        .opt("-c:v", "copy")
        .opt("-max_interleave_delta", "0")
        .arg(output);
    args.into_vec()
}

pub fn final_args(config: &PipelineConfig, input: &Path, output: &Path) -> Vec<OsString> {
    let mut args = FfmpegArgs::new();
    // The output was checked to be absent up front; never clobber it.
    args.arg("-n").opt("-i", input);

    if config.segment_mode == SegmentMode::Pad {
        args.opt("-c:a", "copy");
    } else {
        let audio = config.audio_codec;
        args.opt("-c:a", audio.encoder())
            .opt("-ac", "1")
            .opt("-ar", audio.sample_rate().to_string());
    }

    args.opt("-c:v", config.video_codec.encoder())
        .opt("-preset", config.preset.as_str())
        .opt("-crf", config.crf.to_string());
    if config.compat {
        // baseline has no B-frames
        args.opt("-profile:v", "baseline")
            .opt("-level:v", "3.0")
            .opt("-bf", "0");
    } else {
        args.opt("-bf", B_FRAMES);
    }
    args.opt("-g", KEYFRAME_INTERVAL)
        .opt("-pix_fmt", PIX_FMT)
        .opt("-movflags", "+faststart")
        .arg(output);
    args.into_vec()
}

/// Converts every input into a concat-safe intermediate, returning the
/// intermediates in input order.
///
/// With `jobs > 1` inputs are processed in waves of `jobs` concurrent
/// transcoder processes. A failed wave stops the run once its siblings exit.
pub fn normalize_segments(
    transcoder: &dyn Transcoder,
    config: &PipelineConfig,
    workspace: &Workspace,
    inputs: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    let jobs = config.jobs.clamp(1, inputs.len().max(1));
    // Limit threads per process so concurrent segments don't each take every core.
    let threads = (num_cpus::get().max(1) / jobs).max(1);

    let planned: Vec<(usize, Vec<OsString>)> = inputs
        .iter()
        .enumerate()
        .map(|(position, input)| {
            let output = workspace.segment_path(position);
            (position, segment_args(config, input, &output, threads))
        })
        .collect();

    for wave in planned.chunks(jobs) {
        if let [(position, args)] = wave {
            info!("normalizing segment {}/{}", position + 1, inputs.len());
            transcoder.run(Stage::NormalizeSegments, args)?;
            continue;
        }

        thread::scope(|s| -> Result<()> {
            let handles: Vec<_> = wave
                .iter()
                .map(|(position, args)| {
                    info!("normalizing segment {}/{}", position + 1, inputs.len());
                    s.spawn(move || transcoder.run(Stage::NormalizeSegments, args))
                })
                .collect();

            let mut first_err = None;
            for h in handles {
                let result = h.join().unwrap_or_else(|e| std::panic::resume_unwind(e));
                if let Err(err) = result {
                    first_err.get_or_insert(err);
                }
            }
            first_err.map_or(Ok(()), Err)
        })?;
    }

    Ok((0..inputs.len())
        .map(|position| workspace.segment_path(position))
        .collect())
}

pub fn concat_segments(
    transcoder: &dyn Transcoder,
    workspace: &Workspace,
    segments: &[PathBuf],
) -> Result<PathBuf> {
    let manifest_path = workspace.manifest_path();
    ConcatManifest::new(segments.to_vec()).write_to(&manifest_path)?;

    let output = workspace.concat_path();
    transcoder.run(Stage::Concatenate, &concat_args(&manifest_path, &output))?;
    Ok(output)
}

pub fn encode_output(
    transcoder: &dyn Transcoder,
    config: &PipelineConfig,
    input: &Path,
    output: &Path,
) -> Result<()> {
    transcoder.run(Stage::FinalEncode, &final_args(config, input, output))
}

/// Runs normalize -> concatenate -> final encode inside a fresh workspace.
///
/// Nothing is retried. The first failure aborts the run, and the workspace
/// and every intermediate in it are gone by the time this returns.
pub fn join_and_compress(
    transcoder: &dyn Transcoder,
    config: &PipelineConfig,
    inputs: &[PathBuf],
    output: &Path,
) -> Result<RunSummary> {
    if inputs.is_empty() {
        return Err(Error::NoRecordings);
    }

    let started = Instant::now();
    let workspace = Workspace::create()?;
    let workspace_path = workspace.path().to_path_buf();
    info!("workspace {}", workspace_path.display());

    let log = RunLog::new(transcoder);
    match run_stages(&log, config, &workspace, inputs, output) {
        Ok(()) => {
            workspace.close()?;
            info!("pipeline done after {} transcoder runs", log.runs());
            Ok(RunSummary {
                segment_count: inputs.len(),
                workspace: workspace_path,
                output: output.to_path_buf(),
                stages: log.stages(),
                invocations: log.runs(),
                elapsed: started.elapsed(),
            })
        }
        Err(err) => {
            error!("pipeline failed: {}", err);
            drop(workspace);
            Err(err)
        }
    }
}

fn run_stages(
    transcoder: &dyn Transcoder,
    config: &PipelineConfig,
    workspace: &Workspace,
    inputs: &[PathBuf],
    output: &Path,
) -> Result<()> {
    info!("stage: {}", Stage::NormalizeSegments);
    let segments = normalize_segments(transcoder, config, workspace, inputs)?;

    info!("stage: {}", Stage::Concatenate);
    let concatenated = concat_segments(transcoder, workspace, &segments)?;

    info!("stage: {}", Stage::FinalEncode);
    encode_output(transcoder, config, &concatenated, output)
}
